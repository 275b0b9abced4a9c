use anyhow::{
  Context,
  anyhow
};
use std::sync::OnceLock;

use chrono::{
  DateTime,
  Days,
  Local,
  NaiveDate,
  Utc
};
use regex::Regex;

pub const DATE_FORMAT: &str =
  "%Y-%m-%d";

/// Source of "now" and "today" for
/// everything that stamps or classifies
/// tasks.
pub trait Clock {
  fn now(&self) -> DateTime<Utc>;

  /// Calendar date in the local time
  /// zone, midnight-normalized.
  fn today(&self) -> NaiveDate;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
  fn now(&self) -> DateTime<Utc> {
    Utc::now()
  }

  fn today(&self) -> NaiveDate {
    Local::now().date_naive()
  }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
  pub now:   DateTime<Utc>,
  pub today: NaiveDate
}

impl FixedClock {
  #[must_use]
  pub fn new(
    now: DateTime<Utc>
  ) -> Self {
    Self {
      now,
      today: now.date_naive()
    }
  }
}

impl Clock for FixedClock {
  fn now(&self) -> DateTime<Utc> {
    self.now
  }

  fn today(&self) -> NaiveDate {
    self.today
  }
}

/// Whole days from `today` until
/// `date`; negative once the date has
/// passed.
#[must_use]
pub fn days_until(
  date: NaiveDate,
  today: NaiveDate
) -> i64 {
  date
    .signed_duration_since(today)
    .num_days()
}

#[must_use]
pub fn format_date(
  date: Option<NaiveDate>
) -> String {
  date
    .map(|d| {
      d.format(DATE_FORMAT).to_string()
    })
    .unwrap_or_default()
}

/// Accepts `YYYY-MM-DD`, `today`,
/// `tomorrow`, `yesterday` and
/// relative offsets such as `+3d`,
/// `-1w`.
pub fn parse_date_expr(
  input: &str,
  today: NaiveDate
) -> anyhow::Result<NaiveDate> {
  let token = input.trim();
  let lower =
    token.to_ascii_lowercase();

  match lower.as_str() {
    | "today" => return Ok(today),
    | "tomorrow" => {
      return today
        .checked_add_days(Days::new(1))
        .ok_or_else(|| {
          anyhow!(
            "date out of range: \
             {token}"
          )
        });
    }
    | "yesterday" => {
      return today
        .checked_sub_days(Days::new(1))
        .ok_or_else(|| {
          anyhow!(
            "date out of range: \
             {token}"
          )
        });
    }
    | _ => {}
  }

  if let Some(caps) =
    relative_pattern().captures(&lower)
  {
    let amount: u64 = caps[2]
      .parse()
      .context("invalid offset")?;
    let days = match &caps[3] {
      | "w" => amount * 7,
      | _ => amount
    };
    let shifted = match &caps[1] {
      | "-" => today
        .checked_sub_days(Days::new(
          days
        )),
      | _ => today
        .checked_add_days(Days::new(
          days
        ))
    };
    return shifted.ok_or_else(|| {
      anyhow!(
        "date out of range: {token}"
      )
    });
  }

  NaiveDate::parse_from_str(
    token,
    DATE_FORMAT
  )
  .with_context(|| {
    format!(
      "invalid date '{token}'; \
       expected YYYY-MM-DD"
    )
  })
}

fn relative_pattern() -> &'static Regex
{
  static PATTERN: OnceLock<Regex> =
    OnceLock::new();
  PATTERN.get_or_init(|| {
    Regex::new(
      r"^([+-])(\d{1,4})([dw])$"
    )
    .expect("static pattern compiles")
  })
}

/// Calendar dates stored as
/// `YYYY-MM-DD`. Empty strings and
/// nulls read as absent; absent writes
/// as an empty string, which is what
/// the date inputs of older exports
/// produced.
pub mod optional_date_serde {
  use chrono::NaiveDate;
  use serde::{
    Deserialize,
    Deserializer,
    Serializer
  };

  use super::DATE_FORMAT;

  pub fn serialize<S>(
    date: &Option<NaiveDate>,
    serializer: S
  ) -> Result<S::Ok, S::Error>
  where
    S: Serializer
  {
    match date {
      | Some(value) => serializer
        .serialize_str(
          &value
            .format(DATE_FORMAT)
            .to_string()
        ),
      | None => {
        serializer.serialize_str("")
      }
    }
  }

  pub fn deserialize<'de, D>(
    deserializer: D
  ) -> Result<Option<NaiveDate>, D::Error>
  where
    D: Deserializer<'de>
  {
    let raw = Option::<String>::deserialize(
      deserializer
    )?;
    match raw.as_deref().map(str::trim)
    {
      | None | Some("") => Ok(None),
      | Some(text) => {
        NaiveDate::parse_from_str(
          text,
          DATE_FORMAT
        )
        .map(Some)
        .map_err(
          serde::de::Error::custom
        )
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use chrono::NaiveDate;

  use super::{
    days_until,
    parse_date_expr,
    relative_pattern
  };

  fn june(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(
      2024, 6, day
    )
    .expect("valid date")
  }

  #[test]
  fn parses_named_days() {
    let today = june(10);
    assert_eq!(
      parse_date_expr("today", today)
        .unwrap(),
      june(10)
    );
    assert_eq!(
      parse_date_expr(
        "Tomorrow", today
      )
      .unwrap(),
      june(11)
    );
    assert_eq!(
      parse_date_expr(
        "yesterday",
        today
      )
      .unwrap(),
      june(9)
    );
  }

  #[test]
  fn parses_relative_offsets() {
    let today = june(10);
    assert_eq!(
      parse_date_expr("+3d", today)
        .unwrap(),
      june(13)
    );
    assert_eq!(
      parse_date_expr("-1w", today)
        .unwrap(),
      june(3)
    );
  }

  #[test]
  fn relative_pattern_is_compiled_once() {
    assert!(std::ptr::eq(
      relative_pattern(),
      relative_pattern()
    ));
    assert_eq!(
      parse_date_expr("+2W", june(10))
        .unwrap(),
      june(24)
    );
  }

  #[test]
  fn parses_iso_and_rejects_garbage() {
    let today = june(10);
    assert_eq!(
      parse_date_expr(
        "2024-06-20",
        today
      )
      .unwrap(),
      june(20)
    );
    assert!(
      parse_date_expr(
        "next blue moon",
        today
      )
      .is_err()
    );
  }

  #[test]
  fn counts_whole_days() {
    assert_eq!(
      days_until(june(9), june(10)),
      -1
    );
    assert_eq!(
      days_until(june(12), june(10)),
      2
    );
  }
}
