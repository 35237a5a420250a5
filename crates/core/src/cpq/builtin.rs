use rust_decimal::Decimal;

use crate::cpq::catalog::Catalog;
use crate::domain::delivery::{BusyPeriod, DeliveryCategory, MonthDay, QuantityThreshold};
use crate::domain::product::{
    CategoryId, OptionChoice, OptionGroup, PriceTier, Product, ProductCategory, ProductId,
    QUANTITY_TIERS,
};

pub(crate) fn catalog() -> Catalog {
    Catalog::new(categories(), products(), delivery_categories(), busy_periods())
}

fn categories() -> Vec<ProductCategory> {
    vec![
        category(CategoryId::Calendar, "Calendars", "Desk and wall calendars with your artwork"),
        category(CategoryId::Uchiwa, "Uchiwa fans", "Promotional hand fans for events and summer campaigns"),
        category(CategoryId::Acrylic, "Acrylic goods", "Keychains and stands cut from clear acrylic"),
        category(CategoryId::Towel, "Towels", "Printed face and hand towels"),
        category(CategoryId::Sticker, "Stickers", "Die-cut and sheet stickers"),
        category(CategoryId::Bag, "Bags", "Tote bags and drawstring bags"),
    ]
}

fn products() -> Vec<Product> {
    vec![
        product(
            "calendar-desk",
            "Desk calendar",
            CategoryId::Calendar,
            vec![
                group("type", "Binding", &[("ring", "Ring bound", 100), ("case", "CD case stand", 115)]),
                group("print", "Print", &[("color4", "Full color", 100), ("mono", "Single color", 85)]),
            ],
            [320, 250, 210, 180, 150, 130],
        ),
        product(
            "calendar-wall",
            "Wall calendar",
            CategoryId::Calendar,
            vec![
                group("size", "Size", &[("a2", "A2", 100), ("b3", "B3", 90), ("a1", "A1", 135)]),
                group("paper", "Paper", &[("standard", "Standard coated", 100), ("premium", "Premium matte", 125)]),
                group("pages", "Pages", &[("p13", "13 sheets", 100), ("p7", "7 sheets", 80)]),
            ],
            [480, 390, 340, 290, 250, 220],
        ),
        product(
            "uchiwa-poly",
            "Polypropylene uchiwa",
            CategoryId::Uchiwa,
            vec![
                group("shape", "Shape", &[("standard", "Standard round", 100), ("diecut", "Die-cut", 140)]),
                group("print", "Print", &[("single", "One side", 100), ("double", "Both sides", 130)]),
            ],
            [150, 110, 90, 70, 55, 48],
        ),
        product(
            "uchiwa-paper",
            "Paper uchiwa",
            CategoryId::Uchiwa,
            vec![
                group("print", "Print", &[("single", "One side", 100), ("double", "Both sides", 130)]),
                group("frame", "Frame", &[("plastic", "Plastic frame", 100), ("bamboo", "Bamboo frame", 160)]),
            ],
            [180, 130, 105, 85, 68, 60],
        ),
        product(
            "acrylic-keychain",
            "Acrylic keychain",
            CategoryId::Acrylic,
            vec![
                group("size", "Size", &[("s", "Small (40mm)", 100), ("m", "Medium (60mm)", 120), ("l", "Large (80mm)", 145)]),
                group("print", "Print", &[("single", "One side", 100), ("double", "Both sides", 125)]),
                group("finish", "Finish", &[("clear", "Clear", 100), ("glitter", "Glitter", 130)]),
            ],
            [380, 290, 240, 190, 160, 140],
        ),
        product(
            "acrylic-stand",
            "Acrylic stand",
            CategoryId::Acrylic,
            vec![
                group("size", "Size", &[("m", "Medium (100mm)", 100), ("l", "Large (150mm)", 140)]),
                group("thickness", "Thickness", &[("t3", "3mm", 100), ("t5", "5mm", 120)]),
            ],
            [680, 520, 450, 380, 320, 290],
        ),
        product(
            "towel-face",
            "Face towel",
            CategoryId::Towel,
            vec![
                group("print", "Print", &[("single", "Single color", 100), ("full", "Full color", 180)]),
                group("packaging", "Packaging", &[("none", "No packaging", 100), ("bag", "Individual bag", 110)]),
            ],
            [620, 480, 420, 360, 320, 290],
        ),
        product(
            "sticker-diecut",
            "Die-cut sticker",
            CategoryId::Sticker,
            vec![
                group("material", "Material", &[("paper", "Paper", 100), ("vinyl", "Waterproof vinyl", 120), ("eco", "Recycled paper", 90)]),
                group("lamination", "Lamination", &[("none", "None", 100), ("gloss", "Gloss", 110), ("matte", "Matte", 110)]),
            ],
            [90, 60, 45, 32, 24, 20],
        ),
        product(
            "bag-tote",
            "Cotton tote bag",
            CategoryId::Bag,
            vec![
                group("color", "Fabric color", &[("natural", "Natural", 100), ("colored", "Dyed", 115)]),
                group("print", "Print", &[("single", "One side", 100), ("double", "Both sides", 135)]),
            ],
            [720, 560, 480, 410, 360, 330],
        ),
    ]
}

fn delivery_categories() -> Vec<DeliveryCategory> {
    vec![
        delivery(CategoryId::Calendar, "Calendars", 10, 6, 130, &[(Some(500), 0), (Some(1000), 2), (Some(3000), 4), (None, 6)]),
        delivery(CategoryId::Uchiwa, "Uchiwa fans", 7, 4, 130, &[(Some(300), 0), (Some(1000), 2), (Some(3000), 4), (None, 6)]),
        delivery(CategoryId::Acrylic, "Acrylic goods", 7, 4, 150, &[(Some(100), 0), (Some(300), 3), (Some(1000), 5), (None, 8)]),
        delivery(CategoryId::Towel, "Towels", 14, 10, 130, &[(Some(500), 0), (Some(1000), 3), (None, 7)]),
        delivery(CategoryId::Sticker, "Stickers", 5, 3, 120, &[(Some(500), 0), (Some(3000), 2), (None, 4)]),
        delivery(CategoryId::Bag, "Bags", 12, 8, 140, &[(Some(300), 0), (Some(1000), 3), (None, 6)]),
    ]
}

fn busy_periods() -> Vec<BusyPeriod> {
    vec![
        BusyPeriod {
            label: "Fiscal year-end".to_string(),
            start: MonthDay::new(2, 20),
            end: MonthDay::new(3, 31),
            additional_days: 3,
        },
        BusyPeriod {
            label: "Summer festival season".to_string(),
            start: MonthDay::new(5, 15),
            end: MonthDay::new(7, 31),
            additional_days: 3,
        },
        BusyPeriod {
            label: "Year-end rush".to_string(),
            start: MonthDay::new(11, 15),
            end: MonthDay::new(12, 28),
            additional_days: 5,
        },
    ]
}

fn category(id: CategoryId, name: &str, description: &str) -> ProductCategory {
    ProductCategory { id, name: name.to_string(), description: description.to_string() }
}

/// Modifiers are given in hundredths: 115 is x1.15.
fn group(id: &str, label: &str, choices: &[(&str, &str, i64)]) -> OptionGroup {
    OptionGroup {
        id: id.to_string(),
        label: label.to_string(),
        choices: choices
            .iter()
            .map(|(choice_id, choice_label, hundredths)| OptionChoice {
                id: choice_id.to_string(),
                label: choice_label.to_string(),
                price_modifier: Decimal::new(*hundredths, 2),
            })
            .collect(),
    }
}

fn product(
    id: &str,
    name: &str,
    category: CategoryId,
    options: Vec<OptionGroup>,
    unit_prices: [u64; 6],
) -> Product {
    Product {
        id: ProductId::new(id),
        name: name.to_string(),
        category,
        options,
        base_prices: QUANTITY_TIERS
            .iter()
            .zip(unit_prices)
            .map(|(quantity, unit_price)| PriceTier { quantity: *quantity, unit_price })
            .collect(),
    }
}

fn delivery(
    id: CategoryId,
    name: &str,
    standard_days: u32,
    express_days: u32,
    express_rate_hundredths: i64,
    bands: &[(Option<u32>, u32)],
) -> DeliveryCategory {
    DeliveryCategory {
        id,
        name: name.to_string(),
        standard_days,
        express_days,
        express_rate: Decimal::new(express_rate_hundredths, 2),
        quantity_thresholds: bands
            .iter()
            .map(|(max_quantity, additional_days)| QuantityThreshold {
                max_quantity: *max_quantity,
                additional_days: *additional_days,
            })
            .collect(),
    }
}
