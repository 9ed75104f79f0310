//! Tenant onboarding wizard.
//!
//! The list of screens depends on earlier answers (business type, whether the
//! business offers transport), so step numbers are recomputed after every
//! submission rather than stored.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::error::FieldError;

pub type Answers = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Screen {
    Welcome,
    BusinessType,
    Contact,
    OpeningHours,
    Veterinarians,
    Hospitalization,
    Grooming,
    Inventory,
    Transport,
    Review,
}

impl Screen {
    pub fn key(&self) -> &'static str {
        match self {
            Screen::Welcome => "welcome",
            Screen::BusinessType => "business_type",
            Screen::Contact => "contact",
            Screen::OpeningHours => "opening_hours",
            Screen::Veterinarians => "veterinarians",
            Screen::Hospitalization => "hospitalization",
            Screen::Grooming => "grooming",
            Screen::Inventory => "inventory",
            Screen::Transport => "transport",
            Screen::Review => "review",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        [
            Screen::Welcome,
            Screen::BusinessType,
            Screen::Contact,
            Screen::OpeningHours,
            Screen::Veterinarians,
            Screen::Hospitalization,
            Screen::Grooming,
            Screen::Inventory,
            Screen::Transport,
            Screen::Review,
        ]
        .into_iter()
        .find(|s| s.key() == key)
    }

    /// Answer keys this screen owns; anything else submitted on it is dropped.
    pub fn fields(&self) -> &'static [&'static str] {
        match self {
            Screen::Welcome | Screen::Review => &[],
            Screen::BusinessType => &["business_type", "offers_transport"],
            Screen::Contact => &["name", "phone", "address"],
            Screen::OpeningHours => &["opens_at", "closes_at", "slot_minutes"],
            Screen::Veterinarians => &["veterinarians"],
            Screen::Hospitalization => &["has_hospitalization"],
            Screen::Grooming => &["grooming_services"],
            Screen::Inventory => &["sells_products"],
            Screen::Transport => &["transport_vehicles"],
        }
    }

    fn validate(&self, answers: &Answers) -> Vec<FieldError> {
        let mut errors = Vec::new();
        match self {
            Screen::Welcome | Screen::Review => {}
            Screen::BusinessType => {
                match answers.get("business_type").and_then(Value::as_str) {
                    Some("clinic") | Some("petshop") => {}
                    _ => errors.push(FieldError::new(
                        "business_type",
                        "must be one of: clinic, petshop",
                    )),
                }
                if let Some(v) = answers.get("offers_transport") {
                    if !v.is_boolean() {
                        errors.push(FieldError::new("offers_transport", "must be true or false"));
                    }
                }
            }
            Screen::Contact => {
                require_text(answers, "name", &mut errors);
                require_text(answers, "phone", &mut errors);
            }
            Screen::OpeningHours => {
                let opens = parse_time(answers, "opens_at", &mut errors);
                let closes = parse_time(answers, "closes_at", &mut errors);
                if let (Some(o), Some(c)) = (opens, closes) {
                    if c <= o {
                        errors.push(FieldError::new("closes_at", "must be after opens_at"));
                    }
                }
                if let Some(v) = answers.get("slot_minutes") {
                    match v.as_u64() {
                        Some(m) if (5..=240).contains(&m) => {}
                        _ => errors.push(FieldError::new(
                            "slot_minutes",
                            "must be between 5 and 240",
                        )),
                    }
                }
            }
            Screen::Veterinarians => require_list(answers, "veterinarians", &mut errors),
            Screen::Hospitalization => require_bool(answers, "has_hospitalization", &mut errors),
            Screen::Grooming => require_list(answers, "grooming_services", &mut errors),
            Screen::Inventory => require_bool(answers, "sells_products", &mut errors),
            Screen::Transport => require_list(answers, "transport_vehicles", &mut errors),
        }
        errors
    }
}

fn require_text(answers: &Answers, field: &str, errors: &mut Vec<FieldError>) {
    match answers.get(field).and_then(Value::as_str) {
        Some(s) if !s.trim().is_empty() => {}
        _ => errors.push(FieldError::new(field, "is required")),
    }
}

fn require_bool(answers: &Answers, field: &str, errors: &mut Vec<FieldError>) {
    if !answers.get(field).map_or(false, Value::is_boolean) {
        errors.push(FieldError::new(field, "must be true or false"));
    }
}

fn require_list(answers: &Answers, field: &str, errors: &mut Vec<FieldError>) {
    let ok = answers
        .get(field)
        .and_then(Value::as_array)
        .map_or(false, |items| {
            !items.is_empty()
                && items
                    .iter()
                    .all(|i| i.as_str().map_or(false, |s| !s.trim().is_empty()))
        });
    if !ok {
        errors.push(FieldError::new(field, "must list at least one entry"));
    }
}

fn parse_time(answers: &Answers, field: &str, errors: &mut Vec<FieldError>) -> Option<NaiveTime> {
    let parsed = answers
        .get(field)
        .and_then(Value::as_str)
        .and_then(|s| NaiveTime::parse_from_str(s, "%H:%M").ok());
    if parsed.is_none() {
        errors.push(FieldError::new(field, "must be a time formatted HH:MM"));
    }
    parsed
}

/// Screens to show given the answers so far.
pub fn screens(answers: &Answers) -> Vec<Screen> {
    let mut list = vec![
        Screen::Welcome,
        Screen::BusinessType,
        Screen::Contact,
        Screen::OpeningHours,
    ];
    match answers.get("business_type").and_then(Value::as_str) {
        Some("clinic") => list.extend([Screen::Veterinarians, Screen::Hospitalization]),
        Some("petshop") => list.extend([Screen::Grooming, Screen::Inventory]),
        _ => {}
    }
    if answers.get("offers_transport").and_then(Value::as_bool) == Some(true) {
        list.push(Screen::Transport);
    }
    list.push(Screen::Review);
    list
}

#[derive(Debug, Error, PartialEq)]
pub enum WizardError {
    #[error("Onboarding already completed")]
    AlreadyCompleted,

    #[error("Invalid answers")]
    Invalid(Vec<FieldError>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wizard {
    pub current: Screen,
    pub answers: Answers,
    pub completed: bool,
}

#[derive(Debug, Serialize)]
pub struct WizardState {
    pub screen: Screen,
    pub step: usize,
    pub total_steps: usize,
    pub screens: Vec<Screen>,
    pub progress_percent: u8,
    pub answers: Answers,
    pub completed: bool,
}

/// What a completed wizard writes onto the tenant.
#[derive(Debug, Clone, PartialEq)]
pub struct TenantProfile {
    pub name: String,
    pub business_type: String,
    pub phone: String,
    pub address: Option<String>,
    pub opens_at: NaiveTime,
    pub closes_at: NaiveTime,
    pub slot_minutes: i32,
}

impl Default for Wizard {
    fn default() -> Self {
        Self::new()
    }
}

impl Wizard {
    pub fn new() -> Self {
        Self {
            current: Screen::Welcome,
            answers: Answers::new(),
            completed: false,
        }
    }

    pub fn state(&self) -> WizardState {
        let screens = screens(&self.answers);
        let total = screens.len();
        let index = screens.iter().position(|s| *s == self.current).unwrap_or(0);
        let progress_percent = if self.completed {
            100
        } else {
            ((index * 100) / total.max(1)) as u8
        };
        WizardState {
            screen: self.current,
            step: index + 1,
            total_steps: total,
            screens,
            progress_percent,
            answers: self.answers.clone(),
            completed: self.completed,
        }
    }

    /// Validates `input` against the current screen, merges it and advances.
    /// Only the current screen's keys are taken from `input`. Submitting at
    /// `Review` re-checks every visible screen before completing.
    pub fn submit(&mut self, input: Answers) -> Result<Screen, WizardError> {
        if self.completed {
            return Err(WizardError::AlreadyCompleted);
        }

        let owned = self.current.fields();
        let mut merged = self.answers.clone();
        merged.extend(input.into_iter().filter(|(key, _)| owned.contains(&key.as_str())));

        let errors = if self.current == Screen::Review {
            screens(&merged)
                .iter()
                .flat_map(|screen| screen.validate(&merged))
                .collect()
        } else {
            self.current.validate(&merged)
        };
        if !errors.is_empty() {
            return Err(WizardError::Invalid(errors));
        }
        self.answers = merged;

        if self.current == Screen::Review {
            self.completed = true;
            return Ok(Screen::Review);
        }

        let list = screens(&self.answers);
        self.current = match list.iter().position(|s| *s == self.current) {
            Some(i) => list.get(i + 1).copied().unwrap_or(Screen::Review),
            None => Screen::Review,
        };
        Ok(self.current)
    }

    /// Steps back one screen. Returns `false` on the first screen or once completed.
    pub fn back(&mut self) -> bool {
        if self.completed {
            return false;
        }
        let list = screens(&self.answers);
        match list.iter().position(|s| *s == self.current) {
            Some(i) if i > 0 => {
                self.current = list[i - 1];
                true
            }
            _ => false,
        }
    }

    pub fn profile(&self) -> Option<TenantProfile> {
        let text = |key: &str| {
            self.answers
                .get(key)
                .and_then(Value::as_str)
                .map(|s| s.trim().to_string())
        };
        let time = |key: &str| {
            self.answers
                .get(key)
                .and_then(Value::as_str)
                .and_then(|s| NaiveTime::parse_from_str(s, "%H:%M").ok())
        };

        Some(TenantProfile {
            name: text("name")?,
            business_type: text("business_type")?,
            phone: text("phone")?,
            address: text("address").filter(|a| !a.is_empty()),
            opens_at: time("opens_at")?,
            closes_at: time("closes_at")?,
            slot_minutes: self
                .answers
                .get("slot_minutes")
                .and_then(Value::as_i64)
                .map(|m| m as i32)
                .unwrap_or(30),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn answers(value: Value) -> Answers {
        value.as_object().cloned().unwrap()
    }

    fn walk_to_hours(wizard: &mut Wizard, business_type: &str, transport: bool) {
        wizard.submit(Answers::new()).unwrap();
        wizard
            .submit(answers(json!({
                "business_type": business_type,
                "offers_transport": transport
            })))
            .unwrap();
        wizard
            .submit(answers(json!({"name": "Bicho Feliz", "phone": "11 99999-0000"})))
            .unwrap();
    }

    #[test]
    fn test_petshop_screens() {
        let list = screens(&answers(json!({"business_type": "petshop"})));
        assert_eq!(list.len(), 7);
        assert_eq!(list[4], Screen::Grooming);
        assert_eq!(list[6], Screen::Review);
    }

    #[test]
    fn test_transport_renumbers_review() {
        let mut wizard = Wizard::new();
        walk_to_hours(&mut wizard, "petshop", true);
        let state = wizard.state();
        assert_eq!(state.screen, Screen::OpeningHours);
        assert_eq!(state.step, 4);
        assert_eq!(state.total_steps, 8);
        assert_eq!(state.screens[6], Screen::Transport);
        assert_eq!(state.screens[7], Screen::Review);
    }

    #[test]
    fn test_clinic_flow_completes() {
        let mut wizard = Wizard::new();
        walk_to_hours(&mut wizard, "clinic", false);
        assert_eq!(
            wizard
                .submit(answers(json!({"opens_at": "08:00", "closes_at": "17:30"})))
                .unwrap(),
            Screen::Veterinarians
        );
        wizard
            .submit(answers(json!({"veterinarians": ["Dr. Lima"]})))
            .unwrap();
        assert_eq!(
            wizard
                .submit(answers(json!({"has_hospitalization": true})))
                .unwrap(),
            Screen::Review
        );
        assert_eq!(wizard.state().step, 7);
        wizard.submit(Answers::new()).unwrap();
        assert!(wizard.completed);
        assert_eq!(wizard.state().progress_percent, 100);

        let profile = wizard.profile().unwrap();
        assert_eq!(profile.name, "Bicho Feliz");
        assert_eq!(profile.business_type, "clinic");
        assert_eq!(profile.slot_minutes, 30);
        assert_eq!(profile.closes_at, NaiveTime::from_hms_opt(17, 30, 0).unwrap());

        assert_eq!(
            wizard.submit(Answers::new()).unwrap_err(),
            WizardError::AlreadyCompleted
        );
    }

    #[test]
    fn test_invalid_answers_keep_screen() {
        let mut wizard = Wizard::new();
        walk_to_hours(&mut wizard, "clinic", false);
        let err = wizard
            .submit(answers(json!({"opens_at": "18:00", "closes_at": "08:00"})))
            .unwrap_err();
        match err {
            WizardError::Invalid(fields) => assert_eq!(fields[0].field, "closes_at"),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(wizard.current, Screen::OpeningHours);
        assert!(wizard.answers.get("opens_at").is_none());
    }

    #[test]
    fn test_business_type_required() {
        let mut wizard = Wizard::new();
        wizard.submit(Answers::new()).unwrap();
        let err = wizard
            .submit(answers(json!({"business_type": "zoo"})))
            .unwrap_err();
        assert!(matches!(err, WizardError::Invalid(_)));
    }

    #[test]
    fn test_keys_of_other_screens_are_ignored() {
        let mut wizard = Wizard::new();
        walk_to_hours(&mut wizard, "clinic", false);
        wizard
            .submit(answers(json!({"opens_at": "08:00", "closes_at": "17:00"})))
            .unwrap();

        // Switching business type from the veterinarians screen must not skip ahead
        let next = wizard
            .submit(answers(json!({"veterinarians": ["Dr. Lima"], "business_type": "petshop"})))
            .unwrap();
        assert_eq!(next, Screen::Hospitalization);
        assert_eq!(wizard.answers["business_type"], "clinic");

        wizard
            .submit(answers(json!({"has_hospitalization": false})))
            .unwrap();
        assert_eq!(wizard.current, Screen::Review);

        wizard
            .submit(answers(json!({
                "business_type": "zoo",
                "slot_minutes": 0,
                "opens_at": "18:00",
                "closes_at": "08:00"
            })))
            .unwrap();
        assert!(wizard.completed);
        let profile = wizard.profile().unwrap();
        assert_eq!(profile.business_type, "clinic");
        assert_eq!(profile.slot_minutes, 30);
        assert_eq!(profile.opens_at, NaiveTime::from_hms_opt(8, 0, 0).unwrap());
    }

    #[test]
    fn test_review_rechecks_every_screen() {
        let mut wizard = Wizard {
            current: Screen::Review,
            answers: answers(json!({
                "business_type": "petshop",
                "name": "Au Au",
                "phone": "11 3333-4444",
                "opens_at": "09:00",
                "closes_at": "18:00",
                "slot_minutes": 0,
                "grooming_services": ["banho"],
                "sells_products": true
            })),
            completed: false,
        };
        match wizard.submit(Answers::new()).unwrap_err() {
            WizardError::Invalid(fields) => assert_eq!(fields[0].field, "slot_minutes"),
            other => panic!("unexpected {:?}", other),
        }
        assert!(!wizard.completed);
    }

    #[test]
    fn test_back() {
        let mut wizard = Wizard::new();
        assert!(!wizard.back());
        walk_to_hours(&mut wizard, "petshop", false);
        assert!(wizard.back());
        assert_eq!(wizard.current, Screen::Contact);
    }

    #[test]
    fn test_screen_keys_round_trip() {
        assert_eq!(Screen::from_key("opening_hours"), Some(Screen::OpeningHours));
        assert_eq!(Screen::from_key("nope"), None);
    }
}
