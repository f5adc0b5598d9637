use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

static MONTHLY_DATA: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"monthlypvpdata = \[[^;]+;").expect("valid regex")
});

static WAIT_NOTICE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Note: We will first fetch your data in <b>(\d+)min\(s\)")
        .expect("valid regex")
});

/// One day of the monthly BedWars series.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyEntry {
    pub date: NaiveDate,
    pub fkdr: f64,
    pub kdr: f64,
    pub wlr: f64,
}

/// Pages for players HyStats hasn't scraped yet carry no data blob.
pub fn is_registered(page: &str) -> bool {
    MONTHLY_DATA.is_match(page)
}

pub fn pending_wait_minutes(page: &str) -> Option<u32> {
    WAIT_NOTICE
        .captures(page)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Entries of the `monthlypvpdata` blob, newest first. Malformed entries are skipped.
pub fn parse_monthly_data(page: &str) -> Vec<MonthlyEntry> {
    let Some(blob) = MONTHLY_DATA.find(page) else {
        return Vec::new();
    };
    let blob = blob.as_str();
    let Some(start) = blob.find('[') else {
        return Vec::new();
    };
    let data: String = blob[start..blob.len() - 1]
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '[' && *c != ']')
        .collect();

    let mut out: Vec<MonthlyEntry> = data
        .split(",{")
        .filter_map(|element| {
            let entry = parse_entry(element.trim_matches(|c| c == '{' || c == '}'));
            if entry.is_none() {
                debug!(element, "skipping malformed monthly entry");
            }
            entry
        })
        .collect();
    out.sort_by(|a, b| b.date.cmp(&a.date));
    out
}

fn parse_entry(element: &str) -> Option<MonthlyEntry> {
    let mut values = element
        .split(',')
        .map(|pair| pair.split_once(':').map(|(_, value)| value));
    let date = values.next()??.trim_matches(|c| c == '\'' || c == '"');
    let fkdr = values.next()??.parse().ok()?;
    let kdr = values.next()??.parse().ok()?;
    let wlr = values.next()??.parse().ok()?;
    Some(MonthlyEntry {
        date: NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?,
        fkdr,
        kdr,
        wlr,
    })
}

/// Reply for "what was X's final kill/death ratio yesterday".
pub fn yesterday_fkdr_message(name: &str, page: &str) -> String {
    if !is_registered(page) {
        let wait = match pending_wait_minutes(page) {
            Some(minutes) => format!(
                " {name}'s HyStats page will be updated in {minutes} minutes. \
                 From there, it will be updated every 24 hours."
            ),
            None => String::new(),
        };
        return format!("{name} does not have data available on HyStats.{wait}");
    }

    let data = parse_monthly_data(page);
    let Some(entry) = data.get(1) else {
        return format!(
            "{name} does not have Bedwars data recorded on HyStats yet. \
             Stats are updated every 24 hours."
        );
    };
    let date = entry.date.format("%A, %B %-d, %Y");
    format!("On {date}, {name} had a {} FKDR.", ratio(entry.fkdr))
}

fn ratio(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = "<script>var monthlypvpdata = [
  {date:'2021-01-03', fkdr:1.25, kdr:0.9, wlr:0.5},
  {date:'2021-01-05', fkdr:2, kdr:1.1, wlr:0.7},
  {date:'2021-01-04', fkdr:1.5, kdr:1.0, wlr:0.6}
];</script>";

    #[test]
    fn monthly_entries_newest_first() {
        let data = parse_monthly_data(PAGE);
        assert_eq!(data.len(), 3);
        assert_eq!(data[0].date, NaiveDate::from_ymd_opt(2021, 1, 5).unwrap());
        assert_eq!(data[1].fkdr, 1.5);
        assert_eq!(data[2].wlr, 0.5);
    }

    #[test]
    fn yesterday_uses_second_newest_entry() {
        assert_eq!(
            yesterday_fkdr_message("Steve", PAGE),
            "On Monday, January 4, 2021, Steve had a 1.5 FKDR."
        );
    }

    #[test]
    fn unregistered_player_with_wait_notice() {
        let page = "<p>Note: We will first fetch your data in <b>5min(s)</b></p>";
        assert!(!is_registered(page));
        assert_eq!(
            yesterday_fkdr_message("Alex", page),
            "Alex does not have data available on HyStats. Alex's HyStats page will be \
             updated in 5 minutes. From there, it will be updated every 24 hours."
        );
    }

    #[test]
    fn single_entry_is_not_enough() {
        let page = "monthlypvpdata = [{date:'2021-01-03', fkdr:1, kdr:1, wlr:1}];";
        assert!(
            yesterday_fkdr_message("Alex", page).starts_with("Alex does not have Bedwars data")
        );
    }

    #[test]
    fn whole_ratios_keep_one_decimal() {
        assert_eq!(ratio(2.0), "2.0");
        assert_eq!(ratio(1.25), "1.25");
    }
}
