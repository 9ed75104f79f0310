use crate::error::{ApiError, FieldError};

/// Largest accepted money amount: one billion in the currency's major unit.
pub const MAX_CENTS: i64 = 100_000_000_000;

/// Collects field errors so a form-style request reports every problem at once.
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<FieldError>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn required(&mut self, field: &str, value: &str) -> &mut Self {
        if value.trim().is_empty() {
            self.push(field, "is required");
        }
        self
    }

    pub fn required_opt(&mut self, field: &str, value: Option<&str>) -> &mut Self {
        if let Some(v) = value {
            self.required(field, v);
        }
        self
    }

    pub fn email(&mut self, field: &str, value: Option<&str>) -> &mut Self {
        if let Some(v) = value {
            if !looks_like_email(v) {
                self.push(field, "is not a valid email address");
            }
        }
        self
    }

    pub fn cpf(&mut self, field: &str, value: Option<&str>) -> &mut Self {
        if let Some(v) = value {
            if !crate::cpf::is_valid(v) {
                self.push(field, "is not a valid CPF");
            }
        }
        self
    }

    pub fn positive(&mut self, field: &str, value: i64) -> &mut Self {
        if value <= 0 {
            self.push(field, "must be greater than zero");
        }
        self
    }

    pub fn non_negative(&mut self, field: &str, value: i64) -> &mut Self {
        if value < 0 {
            self.push(field, "must not be negative");
        }
        self
    }

    pub fn at_most(&mut self, field: &str, value: i64, max: i64) -> &mut Self {
        if value > max {
            self.push(field, &format!("must be at most {}", max));
        }
        self
    }

    /// A non-negative amount of cents within [`MAX_CENTS`].
    pub fn money(&mut self, field: &str, value: i64) -> &mut Self {
        self.non_negative(field, value).at_most(field, value, MAX_CENTS)
    }

    pub fn one_of(&mut self, field: &str, value: &str, allowed: &[&str]) -> &mut Self {
        if !allowed.contains(&value) {
            self.push(field, &format!("must be one of: {}", allowed.join(", ")));
        }
        self
    }

    pub fn check(&mut self, ok: bool, field: &str, message: &str) -> &mut Self {
        if !ok {
            self.push(field, message);
        }
        self
    }

    pub fn push(&mut self, field: &str, message: &str) {
        self.errors.push(FieldError::new(field, message));
    }

    pub fn finish(&mut self) -> Result<(), ApiError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(std::mem::take(&mut self.errors)))
        }
    }
}

fn looks_like_email(value: &str) -> bool {
    match value.trim().split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty() && !domain.contains('@'),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(err: ApiError) -> Vec<String> {
        match err {
            ApiError::Validation(fields) => fields.into_iter().map(|f| f.field).collect(),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_reports_every_missing_field() {
        let err = Validator::new()
            .required("name", "")
            .required("phone", "   ")
            .required("species", "dog")
            .finish()
            .unwrap_err();
        assert_eq!(fields(err), vec!["name", "phone"]);
    }

    #[test]
    fn test_money_bounds() {
        let err = Validator::new()
            .money("price_cents", -1)
            .money("cost_cents", MAX_CENTS + 1)
            .money("daily_rate_cents", MAX_CENTS)
            .finish()
            .unwrap_err();
        assert_eq!(fields(err), vec!["price_cents", "cost_cents"]);
    }

    #[test]
    fn test_passes_when_clean() {
        assert!(Validator::new()
            .required("name", "Rex")
            .email("email", Some("ana@clinic.com"))
            .cpf("cpf", None)
            .positive("quantity", 2)
            .finish()
            .is_ok());
    }

    #[test]
    fn test_email_shape() {
        assert!(looks_like_email("a@b"));
        assert!(!looks_like_email("@b"));
        assert!(!looks_like_email("a@"));
        assert!(!looks_like_email("ab"));
        assert!(!looks_like_email("a@b@c"));
    }

    #[test]
    fn test_cpf_and_amounts() {
        let err = Validator::new()
            .cpf("cpf", Some("123.456.789-00"))
            .positive("quantity", 0)
            .non_negative("price_cents", -1)
            .one_of("kind", "gift", &["income", "expense"])
            .finish()
            .unwrap_err();
        assert_eq!(fields(err), vec!["cpf", "quantity", "price_cents", "kind"]);
    }
}
