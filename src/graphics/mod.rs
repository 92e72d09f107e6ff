//! Presentation helpers: the weather-code icon table, the five-day ASCII
//! table for /forecast and the 3-hourly ASCII plots for /now. No decisions
//! are made here, only rendering.

use std::collections::HashMap;

use chrono::NaiveDate;
use rasciigraph::{plot, Config};

use crate::metoffice::types::{Period, Root, METOFFICE_DATE_FORMAT};

const VERT_TOP_LINE: &str = "╭─────┬───────────────────";

/// DataPoint "significant weather" codes. See the DataPoint code list
/// documentation; code 4 is reserved ("not used") and doubles as the
/// fallback for anything unknown.
static WEATHER_TYPES: &[(i64, &str, char)] = &[
    (0, "Clear night", '🌖'),
    (1, "Sunny day", '☀'),
    (2, "Partly cloudy (night)", '🌤'),
    (3, "Partly cloudy (day)", '🌤'),
    (4, "Not used", '-'),
    (5, "Mist", '🌫'),
    (6, "Fog", '🌫'),
    (7, "Cloudy", '⛅'),
    (8, "Overcast", '☁'),
    (9, "Light rain shower (night)", '🌧'),
    (10, "Light rain shower (day)", '🌧'),
    (11, "Drizzle", '🌧'),
    (12, "Light rain", '🌧'),
    (13, "Heavy rain shower (night)", '🌧'),
    (14, "Heavy rain shower (day)", '🌧'),
    (15, "Heavy rain", '🌧'),
    (16, "Sleet shower (night)", '🌨'),
    (17, "Sleet shower (day)", '🌨'),
    (18, "Sleet", '🌨'),
    (19, "Hail shower (night)", '🌨'),
    (20, "Hail shower (day)", '🌨'),
    (21, "Hail", '🌨'),
    (22, "Light snow shower (night)", '❄'),
    (23, "Light snow shower (day)", '❄'),
    (24, "Light snow", '❄'),
    (25, "Heavy snow shower (night)", '❄'),
    (26, "Heavy snow shower (day)", '❄'),
    (27, "Heavy snow", '❄'),
    (28, "Thunder shower (night)", '⛈'),
    (29, "Thunder shower (day)", '⛈'),
    (30, "Thunder", '🌩'),
];

pub fn weather_icon(code: i64) -> char {
    WEATHER_TYPES
        .iter()
        .find(|(c, _, _)| *c == code)
        .map(|(_, _, icon)| *icon)
        .unwrap_or('-')
}

fn rep_value<'a>(period: &'a Period, index: usize, key: &str) -> &'a str {
    period
        .rep
        .get(index)
        .and_then(|rep| rep.get(key))
        .map(String::as_str)
        .unwrap_or("?")
}

fn pad_to_width(row: &mut String, width: usize) {
    while row.chars().count() < width {
        row.push(' ');
    }
}

/// Renders a five-day daily forecast as a small box-drawing table inside a
/// code fence. Returns an empty string when the document doesn't carry
/// exactly five days.
pub fn five_day_table(root: &Root) -> String {
    let days = &root.site_rep.dv.location.periods;
    if days.len() != 5 {
        return String::new();
    }

    let width = VERT_TOP_LINE.chars().count();
    let mut buffer = String::from("```\n╭─────┬────────────────────╮ \n");

    for (i, day) in days.iter().enumerate() {
        let mut row1 = String::from("│ ");
        let mut row2 = String::from("│ ");
        let mut row3 = String::from("│ ");
        let mut row4 = String::from("│ ");

        // expected format like "2019-10-03Z"
        let date = match NaiveDate::parse_from_str(&day.value, METOFFICE_DATE_FORMAT) {
            Ok(date) => date,
            Err(_) => return String::new(),
        };

        row1.push_str(&format!("{} ", date.format("%e")));
        row2.push_str(&date.format("%b").to_string());
        row3.push_str(&date.format("%a").to_string());

        row1.push_str(" │ ");
        row2.push_str(" │ ");
        row3.push_str(" │ ");

        let weather_type = day
            .rep
            .first()
            .and_then(|rep| rep.get("W"))
            .and_then(|w| w.parse().ok())
            .unwrap_or(4);
        row4.push(weather_icon(weather_type));
        row4.push_str("  │");
        pad_to_width(&mut row4, width);

        // max day temperature (night minimum in brackets)
        row1.push_str("T: ");
        row1.push_str(rep_value(day, 0, "Dm"));
        row1.push_str("˚C (");
        row1.push_str(rep_value(day, 1, "Nm"));
        row1.push_str("˚C)");
        pad_to_width(&mut row1, width);

        // noon wind gust (midnight in brackets)
        row2.push_str("W: ");
        row2.push_str(rep_value(day, 0, "Gn"));
        row2.push_str("mph (");
        row2.push_str(rep_value(day, 1, "Gm"));
        row2.push_str("mph)");
        pad_to_width(&mut row2, width);

        // precipitation probability, day (night in brackets)
        row3.push_str("R: ");
        row3.push_str(rep_value(day, 0, "PPd"));
        row3.push_str("% (");
        row3.push_str(rep_value(day, 1, "PPn"));
        row3.push_str("%)");
        pad_to_width(&mut row3, width);

        row1.push_str(" │");
        row2.push_str(" │");
        row3.push_str(" │");
        row4.push('│');

        buffer.push_str(&row4);
        buffer.push('\n');
        buffer.push_str(&row1);
        buffer.push('\n');
        buffer.push_str(&row2);
        buffer.push('\n');
        buffer.push_str(&row3);
        buffer.push('\n');

        if i < 4 {
            buffer.push_str("├─────┼────────────────────┤ \n");
        }
    }

    buffer.push_str("╰─────┴────────────────────╯ \n```\n");
    buffer
}

fn all_values_the_same(values: &[f64]) -> bool {
    match values.split_first() {
        Some((first, rest)) if !rest.is_empty() => rest.iter().all(|v| v == first),
        _ => false,
    }
}

fn round_to_tens(raw: i64) -> f64 {
    (raw as f64 / 10.0).round()
}

/// Plots one numeric series of a 3-hourly day as ASCII art. `round_to_tens`
/// shrinks percentage series so a 0..100 plot doesn't take a hundred lines;
/// the trailing "0" replacement then fakes the scale back.
pub fn detailed_plot(data: &[HashMap<String, String>], key: &str, unit: &str, round: bool) -> String {
    if data.is_empty() {
        return String::new();
    }

    let mut buffer = String::from("```\n");
    buffer.push_str("  ");
    buffer.push_str(unit);
    buffer.push('\n');

    // The plot normalizes values to the drawing width, which distorts short
    // series. Stretch every point to three "pixels" instead of setting a
    // custom width.
    let multiplier = 3;
    let mut series = vec![0.0_f64; data.len() * multiplier];

    // a vertical-axis label of three or more symbols shifts the bottom line
    let mut has_long_value = false;

    for (i, rep) in data.iter().enumerate() {
        let value = match rep.get(key).and_then(|v| v.parse::<i64>().ok()) {
            None => 0.0,
            Some(raw) => {
                let v = if round { round_to_tens(raw) } else { raw as f64 };
                if v >= 100.0 {
                    has_long_value = true;
                }
                v
            }
        };
        series[i * multiplier] = value;
        series[i * multiplier + 1] = value;
        series[i * multiplier + 2] = value;
    }

    // a perfectly flat series makes the plot divide by zero, nudge the tail
    if all_values_the_same(&series) {
        let last = series.len() - 1;
        series[last] -= 1.0;
    }

    let graph = plot(series, Config::default());
    let replacement = if round { "0" } else { "" };
    buffer.push_str(&graph.replace(".00", replacement));

    if data.len() == 8 {
        // full day: eight 3-hour periods, so the hour axis lines up
        let compensation = if has_long_value { " " } else { "" };
        buffer.push_str(&format!("\n{}    └┬──┬──┬──┬──┬──┬──┬──┬", compensation));
        buffer.push_str(&format!("\n{}     0am   6am   12am  6pm", compensation));
    }
    buffer.push_str("\n```\n");

    buffer
}

/// The /now view of one day: temperature, feels-like, wind gust and
/// precipitation probability plots of the 3-hourly reps.
pub fn render_day_detail(reps: &[HashMap<String, String>]) -> String {
    format!(
        "*Temperature*\n{}*Feels like*\n{}*Wind gust*\n{}*Precipitation probability*\n{}",
        detailed_plot(reps, "T", "˚C", false),
        detailed_plot(reps, "F", "˚C", false),
        detailed_plot(reps, "G", "mph", false),
        detailed_plot(reps, "Pp", "%", true),
    )
}
