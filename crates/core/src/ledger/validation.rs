//! Request validation, run before anything is persisted.

use rust_decimal::Decimal;

use super::error::ValidationError;
use super::types::{CreateEntryInput, EditEntryInput, EntryFields, TransactionKind, ValidatedCreate};

/// Maximum number of decimal places in an amount; matches `NUMERIC(19, 4)`.
pub const MAX_AMOUNT_SCALE: u32 = 4;

/// Maximum length of the notes field in characters.
pub const MAX_NOTES_LEN: usize = 2000;

/// Maximum length of the document field in characters.
pub const MAX_DOCUMENT_LEN: usize = 255;

/// Validate a creation request.
///
/// # Errors
///
/// Returns the first missing or malformed field.
pub fn validate_create(input: &CreateEntryInput) -> Result<ValidatedCreate, ValidationError> {
    let customer_id = input
        .customer_id
        .ok_or(ValidationError::MissingField("customer"))?;
    let supplier_id = input
        .supplier_id
        .ok_or(ValidationError::MissingField("supplier"))?;
    let fields = validate_fields(
        input.kind,
        input.amount,
        input.transaction_date,
        input.notes.as_deref(),
        input.document.as_deref(),
    )?;

    Ok(ValidatedCreate {
        customer_id,
        supplier_id,
        fields,
    })
}

/// Validate an edit request.
///
/// # Errors
///
/// Returns the first missing or malformed field.
pub fn validate_edit(input: &EditEntryInput) -> Result<EntryFields, ValidationError> {
    validate_fields(
        input.kind,
        input.amount,
        input.transaction_date,
        input.notes.as_deref(),
        input.document.as_deref(),
    )
}

fn validate_fields(
    kind: Option<TransactionKind>,
    amount: Option<Decimal>,
    transaction_date: Option<chrono::NaiveDate>,
    notes: Option<&str>,
    document: Option<&str>,
) -> Result<EntryFields, ValidationError> {
    let kind = kind.ok_or(ValidationError::MissingField("type"))?;
    let amount = amount.ok_or(ValidationError::MissingField("amount"))?;
    let transaction_date = transaction_date.ok_or(ValidationError::MissingField("date"))?;

    if amount <= Decimal::ZERO {
        return Err(ValidationError::NonPositiveAmount);
    }
    if amount.normalize().scale() > MAX_AMOUNT_SCALE {
        return Err(ValidationError::AmountTooPrecise {
            max_scale: MAX_AMOUNT_SCALE,
        });
    }

    let notes = normalize_text(notes, "notes", MAX_NOTES_LEN)?;
    let document = normalize_text(document, "document", MAX_DOCUMENT_LEN)?;

    Ok(EntryFields {
        kind,
        amount,
        transaction_date,
        notes,
        document,
    })
}

/// Blank text is treated as absent.
fn normalize_text(
    value: Option<&str>,
    field: &'static str,
    max: usize,
) -> Result<Option<String>, ValidationError> {
    let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };
    if value.chars().count() > max {
        return Err(ValidationError::FieldTooLong { field, max });
    }
    Ok(Some(value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use ledgerbook_shared::types::{CustomerId, SupplierId};
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn valid_create() -> CreateEntryInput {
        CreateEntryInput {
            customer_id: Some(CustomerId::new()),
            supplier_id: Some(SupplierId::new()),
            kind: Some(TransactionKind::Invoice),
            amount: Some(dec!(125.50)),
            transaction_date: NaiveDate::from_ymd_opt(2026, 2, 14),
            notes: Some("  March delivery ".to_string()),
            document: None,
            attachments: vec![],
        }
    }

    #[test]
    fn test_valid_create() {
        let validated = validate_create(&valid_create()).unwrap();
        assert_eq!(validated.fields.amount, dec!(125.50));
        assert_eq!(validated.fields.notes.as_deref(), Some("March delivery"));
        assert_eq!(validated.fields.document, None);
    }

    #[rstest]
    #[case::customer(|i: &mut CreateEntryInput| i.customer_id = None, "customer")]
    #[case::supplier(|i: &mut CreateEntryInput| i.supplier_id = None, "supplier")]
    #[case::kind(|i: &mut CreateEntryInput| i.kind = None, "type")]
    #[case::amount(|i: &mut CreateEntryInput| i.amount = None, "amount")]
    #[case::date(|i: &mut CreateEntryInput| i.transaction_date = None, "date")]
    fn test_missing_field(
        #[case] strip: fn(&mut CreateEntryInput),
        #[case] field: &'static str,
    ) {
        let mut input = valid_create();
        strip(&mut input);
        assert_eq!(
            validate_create(&input).unwrap_err(),
            ValidationError::MissingField(field)
        );
    }

    #[rstest]
    #[case(dec!(0))]
    #[case(dec!(-0.01))]
    #[case(dec!(-100))]
    fn test_non_positive_amount(#[case] amount: Decimal) {
        let mut input = valid_create();
        input.amount = Some(amount);
        assert_eq!(
            validate_create(&input).unwrap_err(),
            ValidationError::NonPositiveAmount
        );
    }

    #[rstest]
    #[case::below_storable(dec!(0.00001))]
    #[case::rounding_digit(dec!(10.00005))]
    #[case::far_too_precise(dec!(1.123456789))]
    fn test_amount_too_precise(#[case] amount: Decimal) {
        let mut input = valid_create();
        input.amount = Some(amount);
        assert_eq!(
            validate_create(&input).unwrap_err(),
            ValidationError::AmountTooPrecise {
                max_scale: MAX_AMOUNT_SCALE
            }
        );
    }

    #[rstest]
    #[case::four_places(dec!(10.0001))]
    #[case::trailing_zeros(dec!(10.500000))]
    fn test_storable_amount_precision(#[case] amount: Decimal) {
        let mut input = valid_create();
        input.amount = Some(amount);
        assert_eq!(validate_create(&input).unwrap().fields.amount, amount);
    }

    #[test]
    fn test_notes_too_long() {
        let mut input = valid_create();
        input.notes = Some("x".repeat(MAX_NOTES_LEN + 1));
        assert_eq!(
            validate_create(&input).unwrap_err(),
            ValidationError::FieldTooLong {
                field: "notes",
                max: MAX_NOTES_LEN
            }
        );
    }

    #[test]
    fn test_document_limit_counts_characters() {
        let mut input = valid_create();
        input.document = Some("é".repeat(MAX_DOCUMENT_LEN));
        assert!(validate_create(&input).is_ok());
    }

    #[test]
    fn test_edit_requires_amount() {
        let input = EditEntryInput {
            kind: Some(TransactionKind::Payment),
            amount: None,
            transaction_date: NaiveDate::from_ymd_opt(2026, 2, 14),
            ..Default::default()
        };
        assert_eq!(
            validate_edit(&input).unwrap_err(),
            ValidationError::MissingField("amount")
        );
    }

    #[test]
    fn test_valid_edit() {
        let input = EditEntryInput {
            kind: Some(TransactionKind::Return),
            amount: Some(dec!(20)),
            transaction_date: NaiveDate::from_ymd_opt(2026, 2, 14),
            document: Some("RET-0042".to_string()),
            ..Default::default()
        };
        let fields = validate_edit(&input).unwrap();
        assert_eq!(fields.kind, TransactionKind::Return);
        assert_eq!(fields.document.as_deref(), Some("RET-0042"));
    }
}
