use chrono::NaiveDate;

pub const INVOICE_PREFIX: &str = "INV";

/// Next invoice number in the `INV-YYYYMMDD-NNNN` series. The sequence
/// continues from `latest` when it carries today's date prefix and restarts
/// at 0001 otherwise. A malformed latest number also restarts the series.
pub fn next_invoice_number(today: NaiveDate, latest: Option<&str>) -> String {
    let prefix = format!("{}-{}", INVOICE_PREFIX, today.format("%Y%m%d"));
    let next_seq = latest
        .and_then(|number| number.strip_prefix(&prefix))
        .and_then(|rest| rest.strip_prefix('-'))
        .and_then(|seq| seq.parse::<u32>().ok())
        .map(|seq| seq + 1)
        .unwrap_or(1);
    format!("{}-{:04}", prefix, next_seq)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn first_invoice_of_the_day() {
        assert_eq!(
            next_invoice_number(day(2026, 8, 29), None),
            "INV-20260829-0001"
        );
    }

    #[test]
    fn same_day_sequence_increments() {
        assert_eq!(
            next_invoice_number(day(2026, 8, 29), Some("INV-20260829-0007")),
            "INV-20260829-0008"
        );
    }

    #[test]
    fn new_day_restarts_sequence() {
        assert_eq!(
            next_invoice_number(day(2026, 8, 30), Some("INV-20260829-0123")),
            "INV-20260830-0001"
        );
    }

    #[test]
    fn malformed_latest_restarts_sequence() {
        assert_eq!(
            next_invoice_number(day(2026, 8, 29), Some("garbage")),
            "INV-20260829-0001"
        );
        assert_eq!(
            next_invoice_number(day(2026, 8, 29), Some("INV-20260829-xyz")),
            "INV-20260829-0001"
        );
    }
}
