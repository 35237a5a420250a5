pub mod audit;
pub mod config;
pub mod cpq;
pub mod delivery;
pub mod domain;
pub mod errors;
pub mod flows;
pub mod handoff;
pub mod submission;

pub use cpq::catalog::{Catalog, CatalogError, CatalogValidation, CatalogViolation};
pub use cpq::pricing::{
    calculate_price, format_price, price_strict, price_with_trace, DeterministicPricingEngine,
    PriceResolution, PriceResult, PricingEngine, PricingOutcome,
};
pub use cpq::{DeterministicEstimateRuntime, Estimate, EstimateInput, EstimateRuntime};
pub use delivery::{
    add_business_days, calculate_delivery, find_busy_period, DeliveryCalculator, DeliveryRequest,
    DeliveryResult, DeterministicDeliveryCalculator,
};
pub use domain::customer::CustomerInfo;
pub use domain::delivery::{BusyPeriod, DeliveryCategory, MonthDay, QuantityThreshold};
pub use domain::order::{OrderData, OrderOptionLine, OrderReceipt};
pub use domain::product::{
    CategoryId, OptionChoice, OptionGroup, OptionSelections, PriceTier, Product, ProductCategory,
    ProductId, QUANTITY_TIERS,
};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use handoff::{decode_query, encode_query, Selection, SelectionOutcome, UnresolvableReason};
pub use submission::{MailtoSubmitter, OrderSubmitter, SubmissionError};
