//! Timestamp formats used by AWS request signing.

use time::format_description::FormatItem;
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};

const AMZ_DATE: &[FormatItem<'static>] =
    format_description!("[year][month][day]T[hour][minute][second]Z");
const DATE_STAMP: &[FormatItem<'static>] = format_description!("[year][month][day]");

/// Format a timestamp as an `x-amz-date` value, e.g. `20150830T123600Z`.
pub fn amz_date(datetime: OffsetDateTime) -> String {
    datetime
        .to_offset(UtcOffset::UTC)
        .format(AMZ_DATE)
        .unwrap_or_default()
}

/// Format the date part of a timestamp for a credential scope, e.g. `20150830`.
pub fn date_stamp(datetime: OffsetDateTime) -> String {
    datetime
        .to_offset(UtcOffset::UTC)
        .format(DATE_STAMP)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn formats_utc() {
        let dt = datetime!(2015-08-30 12:36:00 UTC);
        assert_eq!(amz_date(dt), "20150830T123600Z");
        assert_eq!(date_stamp(dt), "20150830");
    }

    #[test]
    fn converts_offsets_to_utc() {
        let dt = datetime!(2015-08-30 23:30:00 -02:00);
        assert_eq!(amz_date(dt), "20150831T013000Z");
        assert_eq!(date_stamp(dt), "20150831");
    }
}
