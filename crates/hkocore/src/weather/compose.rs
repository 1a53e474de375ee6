//! Message text built from weather snapshots
//!
//! Every upstream field is optional. A line whose value is missing is left
//! out together with its label; a message with nothing left to show becomes
//! the localized "data unavailable" text.

use chrono::NaiveDate;
use itertools::Itertools;

use crate::core::utils::{escape_markdown, join_present};
use crate::i18n::{t, Locale};
use crate::weather::model::{
    ActiveWarning, CurrentReport, DailyForecast, LocalForecast, NineDayForecast, SpecialTips, Timestamp, ValueUnit,
    WarningInfo,
};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Station name the feed uses for the observatory headquarters.
fn headquarters(locale: Locale) -> &'static str {
    match locale {
        Locale::ZhHk => "香港天文台",
        Locale::EnUk => "Hong Kong Observatory",
    }
}

fn format_time(time: &Timestamp) -> String {
    time.format(TIME_FORMAT).to_string()
}

/// `27` for whole numbers, `27.5` otherwise.
fn format_number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        value.to_string()
    }
}

fn labelled(locale: Locale, key: &str, value: Option<String>) -> Option<String> {
    value.map(|v| format!("{}: {}", t(locale, key), v))
}

fn unavailable(locale: Locale) -> String {
    t(locale, "error-data-unavailable")
}

fn or_unavailable(text: String, locale: Locale) -> String {
    if text.trim().is_empty() {
        unavailable(locale)
    } else {
        text
    }
}

/// Plain-text current weather report.
pub fn current_weather(report: &CurrentReport, locale: Locale) -> String {
    let place = headquarters(locale);
    let temperature = report
        .temperature
        .as_ref()
        .and_then(|r| r.at(place))
        .and_then(|r| r.value)
        .map(|v| format!("{}°C", format_number(v)));
    let humidity = report
        .humidity
        .as_ref()
        .and_then(|r| r.at(place))
        .and_then(|r| r.value)
        .map(|v| format!("{}%", format_number(v)));
    let uv = report
        .uv_index
        .as_ref()
        .and_then(|uv| uv.data.as_ref())
        .and_then(|data| data.first());

    let mut lines = vec![
        labelled(locale, "label-observation-time", report.update_time.as_ref().map(format_time)),
        labelled(locale, "label-temperature", temperature),
        labelled(locale, "label-humidity", humidity),
        labelled(locale, "label-uv-index", uv.and_then(|u| u.value).map(format_number)),
        labelled(locale, "label-uv-intensity", uv.and_then(|u| u.desc.clone())),
    ];
    if let Some(messages) = &report.warning_message {
        if lines.iter().any(Option::is_some) {
            lines.push(Some(String::new()));
        }
        lines.extend(messages.iter().map(|m| Some(format!("⚠️ {}", m))));
    }

    let text = join_present(lines);
    or_unavailable(text, locale)
}

/// MarkdownV2 local weather forecast.
pub fn general_situation(flw: &LocalForecast, locale: Locale) -> String {
    let period = match (&flw.forecast_period, &flw.forecast_desc) {
        (None, None) => None,
        (period, desc) => Some(join_present([
            period.as_ref().map(|p| format!("__*{}*__", escape_markdown(p))),
            desc.as_ref().map(|d| escape_markdown(d)),
        ])),
    };
    let outlook = flw
        .outlook
        .as_ref()
        .map(|o| format!("__*{}*__\n{}", escape_markdown(&t(locale, "label-outlook")), escape_markdown(o)));

    let body = [
        flw.general_situation.as_ref().map(|s| escape_markdown(s)),
        flw.tc_info.as_ref().map(|s| escape_markdown(s)),
        flw.fire_danger_warning.as_ref().map(|s| escape_markdown(s)),
        period,
        outlook,
    ]
    .into_iter()
    .flatten()
    .join("\n\n");

    if body.is_empty() {
        return escape_markdown(&unavailable(locale));
    }
    match &flw.update_time {
        Some(time) => format!("_{}_\n\n{}", escape_markdown(&format_time(time)), body),
        None => body,
    }
}

fn range(min: Option<&ValueUnit>, max: Option<&ValueUnit>, suffix: &str) -> Option<String> {
    let min = min.and_then(|v| v.value).map(format_number);
    let max = max.and_then(|v| v.value).map(format_number);
    match (min, max) {
        (Some(lo), Some(hi)) => Some(format!("{} – {}{}", lo, hi, suffix)),
        (Some(v), None) | (None, Some(v)) => Some(format!("{}{}", v, suffix)),
        (None, None) => None,
    }
}

fn day_heading(day: &DailyForecast) -> Option<String> {
    let date = day
        .forecast_date
        .as_deref()
        .map(|raw| match NaiveDate::parse_from_str(raw, "%Y%m%d") {
            Ok(date) => date.format("%m-%d").to_string(),
            Err(_) => raw.to_string(),
        });
    match (date, &day.week) {
        (Some(date), Some(week)) => Some(format!("{} ({})", date, week)),
        (Some(date), None) => Some(date),
        (None, Some(week)) => Some(week.clone()),
        (None, None) => None,
    }
}

fn compose_day(day: &DailyForecast, locale: Locale) -> Option<String> {
    let block = join_present([
        day_heading(day).map(|h| format!("*{}*", escape_markdown(&h))),
        labelled(
            locale,
            "label-temperature",
            range(day.forecast_mintemp.as_ref(), day.forecast_maxtemp.as_ref(), "°C"),
        )
        .map(|l| escape_markdown(&l)),
        labelled(
            locale,
            "label-humidity-range",
            range(day.forecast_minrh.as_ref(), day.forecast_maxrh.as_ref(), "%"),
        )
        .map(|l| escape_markdown(&l)),
        labelled(locale, "label-wind", day.forecast_wind.clone()).map(|l| escape_markdown(&l)),
        day.forecast_weather.as_ref().map(|w| escape_markdown(w)),
    ]);
    (!block.is_empty()).then_some(block)
}

/// MarkdownV2 nine-day forecast, one block per day.
pub fn nine_day_forecast(fnd: &NineDayForecast, locale: Locale) -> String {
    let days = fnd
        .weather_forecast
        .iter()
        .flatten()
        .filter_map(|day| compose_day(day, locale));

    let text = fnd
        .general_situation
        .as_ref()
        .map(|s| format!("_{}_", escape_markdown(s)))
        .into_iter()
        .chain(days)
        .join("\n\n");

    if text.is_empty() {
        escape_markdown(&unavailable(locale))
    } else {
        text
    }
}

/// Body of the warnings page: one line per warning in force.
pub fn warnings_overview(warnings: &[ActiveWarning], locale: Locale) -> String {
    if warnings.is_empty() {
        return t(locale, "warnings-none");
    }
    let lines = warnings.iter().map(|w| match w.issued_at.as_ref() {
        Some(issued) => format!("• {} ({} {})", w.name, t(locale, "label-issued"), format_time(issued)),
        None => format!("• {}", w.name),
    });
    std::iter::once(t(locale, "warnings-body")).chain(lines).join("\n")
}

/// Plain-text detail of one warning, preferring the full statement.
pub fn warning_detail(warning: &ActiveWarning, info: Option<&WarningInfo>, locale: Locale) -> String {
    let contents = info
        .and_then(|i| i.detail_for(&warning.statement))
        .and_then(|d| d.contents.as_ref())
        .filter(|c| !c.is_empty())
        .map(|c| c.join("\n"));

    let mut lines = vec![
        Some(warning.name.clone()),
        labelled(locale, "label-issued", warning.issued_at.as_ref().map(format_time)),
        labelled(locale, "label-updated", warning.updated_at.as_ref().map(format_time)),
    ];
    if let Some(contents) = contents {
        lines.push(Some(String::new()));
        lines.push(Some(contents));
    }
    join_present(lines)
}

/// Push notification text for a newly issued or updated warning.
pub fn warning_notification(warning: &ActiveWarning, locale: Locale) -> String {
    let (label, time) = match (&warning.updated_at, &warning.issued_at) {
        (Some(updated), _) if Some(updated) != warning.issued_at.as_ref() => ("label-updated", Some(updated)),
        (_, Some(issued)) => ("label-issued", Some(issued)),
        (Some(updated), None) => ("label-updated", Some(updated)),
        (None, None) => ("label-issued", None),
    };
    match time {
        Some(time) => {
            let mut args = fluent_templates::fluent_bundle::FluentArgs::new();
            args.set("name", warning.name.clone());
            args.set("label", t(locale, label));
            args.set("time", format_time(time));
            crate::i18n::t_args(locale, "notify-warning-issued", &args)
        }
        None => format!("⚠️ {}", warning.name),
    }
}

/// Plain-text special weather tips.
pub fn special_tips(tips: &SpecialTips, locale: Locale) -> String {
    let text = tips
        .swt
        .iter()
        .flatten()
        .filter_map(|tip| {
            let desc = tip.desc.as_ref()?;
            Some(join_present([
                Some(desc.clone()),
                labelled(locale, "label-updated", tip.update_time.as_ref().map(format_time)),
            ]))
        })
        .join("\n\n");

    if text.is_empty() {
        t(locale, "tips-none")
    } else {
        text
    }
}
