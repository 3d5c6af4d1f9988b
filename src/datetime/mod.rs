//! Tolerant date parsing for feed timestamps.
//!
//! Feed dates range from clean RFC 2822/3339 strings to localized
//! natural-language fragments and bare times of day. [`DateNormalizer`]
//! resolves them into UTC timestamps: well-formed strings parse directly,
//! everything else goes through a natural-language parser seeded with the
//! caller's timezone offset and locale.

use chrono::{DateTime, Duration, FixedOffset, NaiveTime, Utc};
use regex::Regex;

/// Parses unreliable date strings, one instance per feed-processing run.
///
/// Strings that fail direct parsing are handed to [`dateparser`] with the
/// configured hour offset as the assumed timezone (the offset only matters
/// when the string itself carries no timezone marker).
///
/// Instances also apply a monotonicity correction on the fallback path: when
/// a newly parsed timestamp lands strictly *later* than the previous one,
/// 24 hours are subtracted. Feeds that print only a time of day for today's
/// entries, listed newest first, otherwise make every older entry look like
/// a future one. The correction can surprise on genuinely ascending
/// timestamps (oldest-first feeds), which is why it never touches directly
/// parsed strings and never leaks across instances.
pub struct DateNormalizer {
    offset: Option<FixedOffset>,
    months: Vec<(Regex, &'static str)>,
    cjk_date: Option<Regex>,
    last: Option<DateTime<Utc>>,
}

impl DateNormalizer {
    /// `offset_hours` may be fractional (`5.5` for IST); `locale` is a BCP 47
    /// tag whose primary subtag selects the month-name table.
    pub fn new(offset_hours: Option<f64>, locale: Option<&str>) -> Self {
        let offset = offset_hours.and_then(|hours| {
            let minutes = (hours * 60.0).round() as i32;
            FixedOffset::east_opt(minutes * 60)
        });

        let primary = locale
            .and_then(|l| l.split(['-', '_']).next())
            .map(|l| l.to_ascii_lowercase());

        let months = primary
            .as_deref()
            .and_then(month_table)
            .map(|table| {
                table
                    .iter()
                    .filter_map(|(name, english)| {
                        Regex::new(&format!(r"(?i)\b{}\b", regex::escape(name)))
                            .ok()
                            .map(|re| (re, *english))
                    })
                    .collect()
            })
            .unwrap_or_default();

        let cjk_date = match primary.as_deref() {
            Some("zh") | Some("ja") => {
                Regex::new(r"(\d{4})年\s*(\d{1,2})月\s*(\d{1,2})日").ok()
            }
            _ => None,
        };

        Self {
            offset,
            months,
            cjk_date,
            last: None,
        }
    }

    /// Parse one date string. Returns `None` when nothing parseable remains
    /// after preprocessing; failed parses leave the monotonic state alone.
    pub fn parse(&mut self, raw: &str) -> Option<DateTime<Utc>> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }

        // Directly parseable strings come back unmodified and bypass the
        // monotonic bookkeeping entirely.
        if let Some(direct) = parse_strict(trimmed) {
            return Some(direct);
        }

        let prepared = self.localize(trimmed);
        let tz = match self.offset {
            Some(tz) => tz,
            None => FixedOffset::east_opt(0)?,
        };
        let mut parsed = dateparser::parse_with(&prepared, &tz, NaiveTime::MIN).ok()?;

        if let Some(last) = self.last {
            if parsed > last {
                parsed = parsed - Duration::hours(24);
            }
        }
        self.last = Some(parsed);
        Some(parsed)
    }

    /// Rewrite localized month names (and CJK year-month-day dates) into
    /// forms the fallback parser understands.
    fn localize(&self, value: &str) -> String {
        let mut out = value.to_string();
        if let Some(ref cjk) = self.cjk_date {
            out = cjk
                .replace_all(&out, |caps: &regex::Captures| {
                    format!("{}-{:0>2}-{:0>2}", &caps[1], &caps[2], &caps[3])
                })
                .into_owned();
        }
        for (pattern, english) in &self.months {
            out = pattern.replace_all(&out, *english).into_owned();
        }
        out
    }
}

fn parse_strict(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc2822(value)
                .map(|dt| dt.with_timezone(&Utc))
                .ok()
        })
        .or_else(|| value.parse::<DateTime<Utc>>().ok())
}

/// Month translations per primary locale subtag. Entries equal to their
/// English spelling are omitted; word boundaries keep abbreviations from
/// matching inside full names.
fn month_table(locale: &str) -> Option<&'static [(&'static str, &'static str)]> {
    const DE: &[(&str, &str)] = &[
        ("Januar", "January"),
        ("Februar", "February"),
        ("März", "March"),
        ("Mär", "Mar"),
        ("Mai", "May"),
        ("Juni", "June"),
        ("Juli", "July"),
        ("Oktober", "October"),
        ("Okt", "Oct"),
        ("Dezember", "December"),
        ("Dez", "Dec"),
    ];
    const FR: &[(&str, &str)] = &[
        ("janvier", "January"),
        ("février", "February"),
        ("mars", "March"),
        ("avril", "April"),
        ("mai", "May"),
        ("juin", "June"),
        ("juillet", "July"),
        ("août", "August"),
        ("septembre", "September"),
        ("octobre", "October"),
        ("novembre", "November"),
        ("décembre", "December"),
    ];
    const ES: &[(&str, &str)] = &[
        ("enero", "January"),
        ("febrero", "February"),
        ("marzo", "March"),
        ("abril", "April"),
        ("mayo", "May"),
        ("junio", "June"),
        ("julio", "July"),
        ("agosto", "August"),
        ("septiembre", "September"),
        ("setiembre", "September"),
        ("octubre", "October"),
        ("noviembre", "November"),
        ("diciembre", "December"),
    ];
    const PT: &[(&str, &str)] = &[
        ("janeiro", "January"),
        ("fevereiro", "February"),
        ("março", "March"),
        ("abril", "April"),
        ("maio", "May"),
        ("junho", "June"),
        ("julho", "July"),
        ("agosto", "August"),
        ("setembro", "September"),
        ("outubro", "October"),
        ("novembro", "November"),
        ("dezembro", "December"),
    ];
    const IT: &[(&str, &str)] = &[
        ("gennaio", "January"),
        ("febbraio", "February"),
        ("marzo", "March"),
        ("aprile", "April"),
        ("maggio", "May"),
        ("giugno", "June"),
        ("luglio", "July"),
        ("agosto", "August"),
        ("settembre", "September"),
        ("ottobre", "October"),
        ("novembre", "November"),
        ("dicembre", "December"),
    ];
    const NL: &[(&str, &str)] = &[
        ("januari", "January"),
        ("februari", "February"),
        ("maart", "March"),
        ("mei", "May"),
        ("juni", "June"),
        ("juli", "July"),
        ("augustus", "August"),
        ("oktober", "October"),
    ];
    const SV: &[(&str, &str)] = &[
        ("januari", "January"),
        ("februari", "February"),
        ("mars", "March"),
        ("maj", "May"),
        ("juni", "June"),
        ("juli", "July"),
        ("augusti", "August"),
        ("oktober", "October"),
    ];
    const RU: &[(&str, &str)] = &[
        ("января", "January"),
        ("январь", "January"),
        ("февраля", "February"),
        ("февраль", "February"),
        ("марта", "March"),
        ("март", "March"),
        ("апреля", "April"),
        ("апрель", "April"),
        ("мая", "May"),
        ("май", "May"),
        ("июня", "June"),
        ("июнь", "June"),
        ("июля", "July"),
        ("июль", "July"),
        ("августа", "August"),
        ("август", "August"),
        ("сентября", "September"),
        ("сентябрь", "September"),
        ("октября", "October"),
        ("октябрь", "October"),
        ("ноября", "November"),
        ("ноябрь", "November"),
        ("декабря", "December"),
        ("декабрь", "December"),
    ];
    const UK: &[(&str, &str)] = &[
        ("січня", "January"),
        ("січень", "January"),
        ("лютого", "February"),
        ("лютий", "February"),
        ("березня", "March"),
        ("березень", "March"),
        ("квітня", "April"),
        ("квітень", "April"),
        ("травня", "May"),
        ("травень", "May"),
        ("червня", "June"),
        ("червень", "June"),
        ("липня", "July"),
        ("липень", "July"),
        ("серпня", "August"),
        ("серпень", "August"),
        ("вересня", "September"),
        ("вересень", "September"),
        ("жовтня", "October"),
        ("жовтень", "October"),
        ("листопада", "November"),
        ("листопад", "November"),
        ("грудня", "December"),
        ("грудень", "December"),
    ];

    match locale {
        "de" => Some(DE),
        "fr" => Some(FR),
        "es" => Some(ES),
        "pt" => Some(PT),
        "it" => Some(IT),
        "nl" => Some(NL),
        "sv" => Some(SV),
        "ru" => Some(RU),
        "uk" => Some(UK),
        _ => None,
    }
}
