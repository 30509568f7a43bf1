//! Type-specific rule application
//!
//! String rules run in a fixed order after trimming: pattern, date, hash,
//! cipher, min length, max length, case folding. A passing date check and
//! the hash/cipher transforms each end the chain early, so hash wins over
//! cipher by evaluation order when both flags are set.

use chrono::NaiveDate;

use crate::schema::{FieldDef, FloatRule, IntRule, StringRule, UintRule, ValidationRule};

use super::coerce::TypedValue;
use super::context::ValidateContext;
use super::errors::{FieldResult, ValidationError};

/// Applies the field's rule to an already-coerced value.
pub fn apply_rules(
    field: &FieldDef,
    value: TypedValue,
    ctx: &ValidateContext,
) -> FieldResult<TypedValue> {
    match (&field.rule, value) {
        (ValidationRule::Str(rule), TypedValue::Str(s)) => apply_string_rule(rule, s, ctx),
        (ValidationRule::Float(rule), TypedValue::Float(f)) => apply_float_rule(rule, f),
        (ValidationRule::Int(rule), TypedValue::Int(i)) => apply_int_rule(rule, i),
        (ValidationRule::Uint(rule), TypedValue::Uint(u)) => apply_uint_rule(rule, u),
        // Rule/type consistency is enforced at schema construction, and
        // coercion already produced a value of the declared type.
        (_, value) => Ok(value),
    }
}

fn apply_string_rule(rule: &StringRule, raw: String, ctx: &ValidateContext) -> FieldResult<TypedValue> {
    let mut value = raw.trim().to_string();

    if let Some(pattern) = &rule.pattern {
        if !pattern.is_match(&value) {
            return Err(ValidationError::PatternMismatch);
        }
    }

    if rule.date {
        return match NaiveDate::parse_from_str(&value, "%d/%m/%Y") {
            Ok(_) => Ok(TypedValue::Str(value)),
            Err(_) => Err(ValidationError::InvalidDate),
        };
    }

    if rule.hash {
        return super::crypto::hash_value(&value).map(TypedValue::Str);
    }

    if rule.cipher {
        let cipher = ctx.cipher().ok_or(ValidationError::CipherKeyMissing)?;
        return cipher.encrypt(&value).map(TypedValue::Str);
    }

    if rule.min > 0 && value.len() < rule.min {
        return Err(ValidationError::LengthViolation {
            min: rule.min,
            max: rule.max,
            actual: value.len(),
        });
    }
    if rule.max > 0 && value.len() > rule.max {
        return Err(ValidationError::LengthViolation {
            min: rule.min,
            max: rule.max,
            actual: value.len(),
        });
    }

    if rule.upper_case {
        value = value.to_uppercase();
    } else if rule.lower_case {
        value = value.to_lowercase();
    }

    Ok(TypedValue::Str(value))
}

fn apply_float_rule(rule: &FloatRule, value: f64) -> FieldResult<TypedValue> {
    // A bound of exactly 0.0 means unbounded; the allowed range between
    // two configured bounds excludes the bounds themselves.
    if rule.lower_bound != 0.0 && value <= rule.lower_bound {
        return Err(ValidationError::RangeViolation(format!(
            "must be strictly greater than {}",
            rule.lower_bound
        )));
    }
    if rule.upper_bound != 0.0 && value >= rule.upper_bound {
        return Err(ValidationError::RangeViolation(format!(
            "must be strictly less than {}",
            rule.upper_bound
        )));
    }
    if !rule.allow_negative && value < 0.0 {
        return Err(ValidationError::SignViolation);
    }

    // Division happens after every check; bounds apply to the raw value.
    let value = if rule.percentage { value / 100.0 } else { value };
    Ok(TypedValue::Float(value))
}

fn apply_int_rule(rule: &IntRule, value: i64) -> FieldResult<TypedValue> {
    if !rule.allow_negative && value < 0 {
        return Err(ValidationError::SignViolation);
    }
    if rule.min != 0 && value < rule.min {
        return Err(ValidationError::RangeViolation(format!(
            "must not be less than {}",
            rule.min
        )));
    }
    if rule.max != 0 && value > rule.max {
        return Err(ValidationError::RangeViolation(format!(
            "must not be greater than {}",
            rule.max
        )));
    }
    Ok(TypedValue::Int(value))
}

fn apply_uint_rule(rule: &UintRule, value: u64) -> FieldResult<TypedValue> {
    if rule.max > 0 && value > rule.max {
        return Err(ValidationError::RangeViolation(format!(
            "must not be greater than {}",
            rule.max
        )));
    }
    Ok(TypedValue::Uint(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::DataType;
    use regex::Regex;

    fn string_field(rule: StringRule) -> FieldDef {
        FieldDef::string("name", "full name").with_rule(ValidationRule::Str(rule))
    }

    fn apply_str(rule: StringRule, value: &str) -> FieldResult<TypedValue> {
        apply_rules(
            &string_field(rule),
            TypedValue::Str(value.into()),
            &ValidateContext::new(),
        )
    }

    #[test]
    fn test_trim_runs_before_everything() {
        let rule = StringRule {
            min: 3,
            ..Default::default()
        };
        // "  ab  " trims to "ab", below the minimum
        assert!(matches!(
            apply_str(rule, "  ab  "),
            Err(ValidationError::LengthViolation { actual: 2, .. })
        ));
    }

    #[test]
    fn test_pattern_mismatch() {
        let rule = StringRule {
            pattern: Some(Regex::new(r"^[0-9]+$").unwrap()),
            ..Default::default()
        };
        assert!(matches!(
            apply_str(rule.clone(), "abc"),
            Err(ValidationError::PatternMismatch)
        ));
        assert!(apply_str(rule, "123").is_ok());
    }

    #[test]
    fn test_date_check_and_short_circuit() {
        let rule = StringRule {
            date: true,
            min: 50, // unreachable: a valid date ends the chain
            ..Default::default()
        };
        assert_eq!(
            apply_str(rule.clone(), "31/12/2024").unwrap(),
            TypedValue::Str("31/12/2024".into())
        );
        assert!(matches!(
            apply_str(rule, "2024-12-31"),
            Err(ValidationError::InvalidDate)
        ));
    }

    #[test]
    fn test_invalid_calendar_date_rejected() {
        let rule = StringRule {
            date: true,
            ..Default::default()
        };
        assert!(apply_str(rule, "31/02/2024").is_err());
    }

    #[test]
    fn test_hash_short_circuits_length_and_case() {
        let rule = StringRule {
            hash: true,
            max: 4, // would reject the hash output if it were applied
            upper_case: true,
            ..Default::default()
        };
        let out = apply_str(rule, "secret").unwrap();
        let TypedValue::Str(s) = out else { panic!() };
        assert!(s.starts_with("$argon2"));
    }

    #[test]
    fn test_hash_wins_over_cipher_by_evaluation_order() {
        let rule = StringRule {
            hash: true,
            cipher: true,
            ..Default::default()
        };
        let field = string_field(rule);
        // No cipher key configured: would fail if cipher were reached.
        let out = apply_rules(
            &field,
            TypedValue::Str("secret".into()),
            &ValidateContext::new(),
        )
        .unwrap();
        let TypedValue::Str(s) = out else { panic!() };
        assert!(s.starts_with("$argon2"));
    }

    #[test]
    fn test_cipher_requires_key() {
        let rule = StringRule {
            cipher: true,
            ..Default::default()
        };
        assert!(matches!(
            apply_str(rule, "secret"),
            Err(ValidationError::CipherKeyMissing)
        ));
    }

    #[test]
    fn test_cipher_replaces_value() {
        let rule = StringRule {
            cipher: true,
            ..Default::default()
        };
        let field = string_field(rule);
        let ctx = ValidateContext::with_cipher_key([1u8; 32]);
        let out = apply_rules(&field, TypedValue::Str("secret".into()), &ctx).unwrap();
        let TypedValue::Str(s) = out else { panic!() };
        assert_ne!(s, "secret");
        assert_eq!(ctx.cipher().unwrap().decrypt(&s).unwrap(), "secret");
    }

    #[test]
    fn test_case_folding_upper_wins() {
        let rule = StringRule {
            upper_case: true,
            lower_case: true,
            ..Default::default()
        };
        assert_eq!(
            apply_str(rule, "MiXeD").unwrap(),
            TypedValue::Str("MIXED".into())
        );
    }

    #[test]
    fn test_float_zero_bounds_mean_unbounded() {
        let rule = FloatRule::default();
        assert!(apply_float_rule(&rule, 1e12).is_ok());
        assert!(apply_float_rule(&rule, 0.0).is_ok());
        assert_eq!(
            apply_float_rule(&rule, -0.0001).unwrap_err(),
            ValidationError::SignViolation
        );
    }

    #[test]
    fn test_float_bounds_are_exclusive() {
        let rule = FloatRule {
            lower_bound: 1.0,
            upper_bound: 10.0,
            ..Default::default()
        };
        assert!(apply_float_rule(&rule, 1.0).is_err());
        assert!(apply_float_rule(&rule, 10.0).is_err());
        assert!(apply_float_rule(&rule, 5.0).is_ok());
    }

    #[test]
    fn test_float_percentage_divides_after_checks() {
        let rule = FloatRule {
            percentage: true,
            upper_bound: 101.0,
            ..Default::default()
        };
        // 100 passes the bound check on the raw value, then divides.
        assert_eq!(
            apply_float_rule(&rule, 100.0).unwrap(),
            TypedValue::Float(1.0)
        );
    }

    #[test]
    fn test_int_rule_bounds_and_sign() {
        let rule = IntRule {
            min: 5,
            max: 10,
            allow_negative: false,
        };
        assert!(apply_int_rule(&rule, 4).is_err());
        assert!(apply_int_rule(&rule, 11).is_err());
        assert!(apply_int_rule(&rule, 7).is_ok());
        assert_eq!(
            apply_int_rule(&IntRule::default(), -1).unwrap_err(),
            ValidationError::SignViolation
        );
    }

    #[test]
    fn test_int_negative_allowed_when_flagged() {
        let rule = IntRule {
            allow_negative: true,
            ..Default::default()
        };
        assert!(apply_int_rule(&rule, -42).is_ok());
    }

    #[test]
    fn test_uint_rule_max() {
        let rule = UintRule { max: 100 };
        assert!(apply_uint_rule(&rule, 101).is_err());
        assert!(apply_uint_rule(&rule, 100).is_ok());
        assert!(apply_uint_rule(&UintRule::default(), u64::MAX).is_ok());
    }

    #[test]
    fn test_no_rule_passes_value_through() {
        let field = FieldDef::new("flag", "a flag", DataType::Bool);
        let out = apply_rules(&field, TypedValue::Bool(true), &ValidateContext::new()).unwrap();
        assert_eq!(out, TypedValue::Bool(true));
    }
}
