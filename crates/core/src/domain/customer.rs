use serde::{Deserialize, Serialize};

/// Contact fields collected by the order flow.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerInfo {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl CustomerInfo {
    pub fn missing_fields(&self) -> Vec<String> {
        let mut missing = Vec::new();
        if self.name.trim().is_empty() {
            missing.push("name".to_string());
        }

        let email = self.email.trim();
        if email.is_empty() || !looks_like_email(email) {
            missing.push("email".to_string());
        }

        missing
    }
}

fn looks_like_email(value: &str) -> bool {
    match value.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.ends_with('.'),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::CustomerInfo;

    #[test]
    fn complete_customer_has_no_missing_fields() {
        let customer = CustomerInfo {
            name: "Aiko Tanaka".to_string(),
            email: "aiko@example.co.jp".to_string(),
            ..CustomerInfo::default()
        };

        assert!(customer.missing_fields().is_empty());
    }

    #[test]
    fn blank_name_and_malformed_email_are_reported() {
        let customer = CustomerInfo {
            name: "  ".to_string(),
            email: "aiko@localhost".to_string(),
            ..CustomerInfo::default()
        };

        assert_eq!(customer.missing_fields(), vec!["name".to_string(), "email".to_string()]);
    }
}
