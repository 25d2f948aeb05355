use anyhow::{
  Context,
  anyhow
};
use chrono::{
  DateTime,
  Datelike,
  Duration,
  Local,
  LocalResult,
  NaiveDate,
  NaiveDateTime,
  TimeZone,
  Utc,
  Weekday
};
use chrono_tz::Tz;
use regex::Regex;

const TIMEZONE_ENV_VAR: &str =
  "NAVFLOW_TIMEZONE";

/// Time zone used for day boundaries
/// and date display.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Zone {
  Local,
  Named(Tz)
}

impl Zone {
  /// Environment beats config; an
  /// unparsable id falls back to local
  /// time.
  pub fn resolve(
    configured: Option<&str>
  ) -> Self {
    if let Ok(raw) =
      std::env::var(TIMEZONE_ENV_VAR)
      && let Some(tz) = parse_timezone(
        &raw,
        TIMEZONE_ENV_VAR
      )
    {
      return Zone::Named(tz);
    }

    if let Some(raw) = configured
      && let Some(tz) =
        parse_timezone(raw, "config")
    {
      return Zone::Named(tz);
    }

    Zone::Local
  }

  #[must_use]
  pub fn window(
    &self,
    now: DateTime<Utc>
  ) -> DueWindow {
    match self {
      | Zone::Local => DueWindow::at(
        &now.with_timezone(&Local)
      ),
      | Zone::Named(tz) => {
        DueWindow::at(
          &now.with_timezone(tz)
        )
      }
    }
  }

  #[must_use]
  pub fn local_date(
    &self,
    dt: DateTime<Utc>
  ) -> NaiveDate {
    match self {
      | Zone::Local => dt
        .with_timezone(&Local)
        .date_naive(),
      | Zone::Named(tz) => {
        dt.with_timezone(tz).date_naive()
      }
    }
  }

  #[must_use]
  pub fn format_date(
    &self,
    dt: DateTime<Utc>
  ) -> String {
    self
      .local_date(dt)
      .format("%Y-%m-%d")
      .to_string()
  }

  #[must_use]
  pub fn format_datetime(
    &self,
    dt: DateTime<Utc>
  ) -> String {
    match self {
      | Zone::Local => dt
        .with_timezone(&Local)
        .format("%Y-%m-%d %H:%M")
        .to_string(),
      | Zone::Named(tz) => dt
        .with_timezone(tz)
        .format("%Y-%m-%d %H:%M")
        .to_string()
    }
  }

  pub fn parse_date_expr(
    &self,
    input: &str,
    now: DateTime<Utc>
  ) -> anyhow::Result<DateTime<Utc>> {
    match self {
      | Zone::Local => parse_date_expr(
        input,
        &now.with_timezone(&Local)
      ),
      | Zone::Named(tz) => {
        parse_date_expr(
          input,
          &now.with_timezone(tz)
        )
      }
    }
  }
}

/// Day boundaries around "now", as UTC
/// instants, for due-date bucketing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DueWindow {
  pub now:             DateTime<Utc>,
  pub today_start:     DateTime<Utc>,
  pub tomorrow_start:  DateTime<Utc>,
  pub day_after_start: DateTime<Utc>,
  pub week_end:        DateTime<Utc>
}

impl DueWindow {
  pub fn at<Z: TimeZone>(
    now: &DateTime<Z>
  ) -> Self {
    let tz = now.timezone();
    let today = now.date_naive();
    let day = |offset: u64| {
      today
        .checked_add_days(
          chrono::Days::new(offset)
        )
        .unwrap_or(today)
    };

    let window = Self {
      now:             now
        .with_timezone(&Utc),
      today_start:     local_midnight(
        &tz, today
      ),
      tomorrow_start:  local_midnight(
        &tz,
        day(1)
      ),
      day_after_start: local_midnight(
        &tz,
        day(2)
      ),
      week_end:        local_midnight(
        &tz,
        day(7)
      )
    };
    tracing::trace!(?window, "computed due window");
    window
  }

  pub fn is_overdue(
    &self,
    due: DateTime<Utc>
  ) -> bool {
    due < self.today_start
  }

  pub fn is_today(
    &self,
    due: DateTime<Utc>
  ) -> bool {
    due >= self.today_start
      && due < self.tomorrow_start
  }

  pub fn is_tomorrow(
    &self,
    due: DateTime<Utc>
  ) -> bool {
    due >= self.tomorrow_start
      && due < self.day_after_start
  }

  /// Today through seven days out,
  /// inclusive of the closing midnight.
  pub fn is_this_week(
    &self,
    due: DateTime<Utc>
  ) -> bool {
    due >= self.today_start
      && due <= self.week_end
  }
}

fn local_midnight<Z: TimeZone>(
  tz: &Z,
  date: NaiveDate
) -> DateTime<Utc> {
  for hour in [0, 1] {
    let Some(naive) =
      date.and_hms_opt(hour, 0, 0)
    else {
      continue;
    };
    match tz.from_local_datetime(&naive)
    {
      | LocalResult::Single(dt) => {
        return dt.with_timezone(&Utc);
      }
      | LocalResult::Ambiguous(
        first,
        second
      ) => {
        let first = first
          .with_timezone(&Utc);
        let second = second
          .with_timezone(&Utc);
        return first.min(second);
      }
      | LocalResult::None => {}
    }
  }

  tracing::warn!(%date, "no local midnight; treating date as UTC");
  Utc.from_utc_datetime(
    &date.and_time(
      chrono::NaiveTime::MIN
    )
  )
}

fn parse_timezone(
  raw: &str,
  source: &str
) -> Option<Tz> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    return None;
  }

  match trimmed.parse::<Tz>() {
    | Ok(tz) => {
      tracing::debug!(
        source,
        timezone = %trimmed,
        "configured timezone"
      );
      Some(tz)
    }
    | Err(err) => {
      tracing::warn!(
        source,
        timezone = %trimmed,
        error = %err,
        "failed to parse timezone id; using local time"
      );
      None
    }
  }
}

fn to_utc_from_local<Z: TimeZone>(
  tz: &Z,
  local_naive: NaiveDateTime,
  context: &str
) -> anyhow::Result<DateTime<Utc>> {
  match tz
    .from_local_datetime(&local_naive)
  {
    | LocalResult::Single(local_dt) => {
      Ok(local_dt.with_timezone(&Utc))
    }
    | LocalResult::Ambiguous(
      first,
      second
    ) => {
      let first =
        first.with_timezone(&Utc);
      let second =
        second.with_timezone(&Utc);
      tracing::warn!(
        context,
        %first,
        %second,
        "ambiguous local datetime; using earliest"
      );
      Ok(first.min(second))
    }
    | LocalResult::None => {
      Err(anyhow!(
        "local datetime does not \
         exist in configured \
         timezone: {context}"
      ))
    }
  }
}

/// Parses a due-date expression typed
/// on the command line.
#[tracing::instrument(skip(now), fields(input = input))]
pub fn parse_date_expr<Z: TimeZone>(
  input: &str,
  now: &DateTime<Z>
) -> anyhow::Result<DateTime<Utc>> {
  let tz = now.timezone();
  let token = input.trim();
  let lower =
    token.to_ascii_lowercase();
  let today = now.date_naive();

  let midnight_of =
    |date: NaiveDate, ctx: &str| {
      let naive = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| {
          anyhow!(
            "failed to construct \
             midnight for {ctx}"
          )
        })?;
      to_utc_from_local(&tz, naive, ctx)
    };

  match lower.as_str() {
    | "now" => {
      return Ok(
        now.with_timezone(&Utc)
      );
    }
    | "today" => {
      return midnight_of(today, "today");
    }
    | "tomorrow" => {
      let date = today
        .succ_opt()
        .ok_or_else(|| {
          anyhow!("date out of range")
        })?;
      return midnight_of(
        date, "tomorrow"
      );
    }
    | "yesterday" => {
      let date = today
        .pred_opt()
        .ok_or_else(|| {
          anyhow!("date out of range")
        })?;
      return midnight_of(
        date,
        "yesterday"
      );
    }
    | _ => {}
  }

  if let Some(target) =
    parse_weekday_name(&lower)
  {
    return midnight_of(
      next_weekday_date(today, target),
      "weekday-name"
    );
  }

  let rel_re = Regex::new(
    r"^(?P<sign>[+-])(?P<num>\d+)(?P<unit>[wdhm])$"
  )
  .map_err(|e| {
    anyhow!(
      "internal regex compile \
       failure: {e}"
    )
  })?;

  if let Some(caps) =
    rel_re.captures(&lower)
  {
    let num: i64 = caps["num"]
      .parse()
      .context(
        "invalid relative number"
      )?;
    let duration = match &caps["unit"]
    {
      | "w" => Duration::weeks(num),
      | "d" => Duration::days(num),
      | "h" => Duration::hours(num),
      | "m" => Duration::minutes(num),
      | unit => {
        return Err(anyhow!(
          "unknown relative unit: \
           {unit}"
        ));
      }
    };
    let base = now.with_timezone(&Utc);
    return Ok(
      if &caps["sign"] == "-" {
        base - duration
      } else {
        base + duration
      }
    );
  }

  if let Ok(dt) =
    DateTime::parse_from_rfc3339(token)
  {
    return Ok(dt.with_timezone(&Utc));
  }

  if let Ok(date) =
    NaiveDate::parse_from_str(
      token, "%Y-%m-%d"
    )
  {
    return midnight_of(date, "date");
  }

  for fmt in
    ["%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"]
  {
    if let Ok(ndt) =
      NaiveDateTime::parse_from_str(
        token, fmt
      )
    {
      return to_utc_from_local(
        &tz, ndt, fmt
      );
    }
  }

  Err(anyhow!(
    "unrecognized date expression: \
     {input}"
  ))
  .with_context(|| {
    "supported formats: \
     now/today/tomorrow/yesterday, \
     weekday names (e.g. monday), \
     +Nw/+Nd/+Nh/+Nm, RFC3339, \
     YYYY-MM-DD, YYYY-MM-DDTHH:MM, \
     YYYY-MM-DD HH:MM"
  })
}

fn parse_weekday_name(
  token: &str
) -> Option<Weekday> {
  match token.trim() {
    | "monday" | "mon" => {
      Some(Weekday::Mon)
    }
    | "tuesday" | "tue" | "tues" => {
      Some(Weekday::Tue)
    }
    | "wednesday" | "wed" => {
      Some(Weekday::Wed)
    }
    | "thursday" | "thu" | "thur"
    | "thurs" => Some(Weekday::Thu),
    | "friday" | "fri" => {
      Some(Weekday::Fri)
    }
    | "saturday" | "sat" => {
      Some(Weekday::Sat)
    }
    | "sunday" | "sun" => {
      Some(Weekday::Sun)
    }
    | _ => None
  }
}

fn next_weekday_date(
  from: NaiveDate,
  target: Weekday
) -> NaiveDate {
  let from_idx = from
    .weekday()
    .num_days_from_monday()
    as i64;
  let target_idx = target
    .num_days_from_monday()
    as i64;
  let mut delta =
    (7 + target_idx - from_idx) % 7;
  if delta == 0 {
    delta = 7;
  }
  from
    .checked_add_signed(Duration::days(
      delta
    ))
    .unwrap_or(from)
}

/// `95` -> `1h 35m`.
pub fn format_minutes(
  minutes: u64
) -> String {
  let hours = minutes / 60;
  let rest = minutes % 60;
  if hours == 0 {
    format!("{rest}m")
  } else {
    format!("{hours}h {rest:02}m")
  }
}

/// Coarse "time ago" label for activity
/// listings.
pub fn format_ago(
  then: DateTime<Utc>,
  now: DateTime<Utc>
) -> String {
  let delta = now - then;
  let plural = |n: i64, unit: &str| {
    if n == 1 {
      format!("1 {unit} ago")
    } else {
      format!("{n} {unit}s ago")
    }
  };

  if delta < Duration::minutes(1) {
    "just now".to_string()
  } else if delta < Duration::hours(1)
  {
    plural(delta.num_minutes(), "minute")
  } else if delta < Duration::days(1) {
    plural(delta.num_hours(), "hour")
  } else {
    plural(delta.num_days(), "day")
  }
}
