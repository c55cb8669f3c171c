//! Server-side HTML for the operator pages. The map itself is drawn in the browser by Leaflet.
use html_escape::{encode_double_quoted_attribute, encode_text};
use itertools::Itertools;

use crate::dal::stops::StopRegistry;
use crate::model::itinerary::{OrderRow, StopPair};
use crate::model::map_view::MapView;
use crate::model::passenger::{default_boarding_time, hh_mm};

/// Number of stop dropdowns on the route page
pub const ROUTE_SLOTS: usize = 6;

pub const EMPTY_ITINERARY_HINT: &str = "승객을 등록하세요.";
pub const EMPTY_SELECTION_MESSAGE: &str = "출발지와 도착지를 모두 선택하세요.";

#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    Success(String),
    Error(String),
    Info(String),
}

impl Notice {
    fn render(&self) -> String {
        let (class, text) = match self {
            Notice::Success(t) => ("success", t),
            Notice::Error(t) => ("error", t),
            Notice::Info(t) => ("info", t),
        };
        format!(r#"<div class="notice {class}">{}</div>"#, encode_text(text))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Passengers,
    Pairs,
    Route,
}

const STYLE: &str = r#"
body { font-family: sans-serif; margin: 0 24px 24px; }
nav a { margin-right: 16px; }
nav a.active { font-weight: bold; }
.columns { display: grid; grid-template-columns: 2.5fr 3fr; gap: 48px; }
table { border-collapse: collapse; width: 100%; }
th, td { border: 1px solid #ddd; padding: 4px 8px; white-space: pre; text-align: left; }
.notice { padding: 8px 12px; margin: 8px 0; border-radius: 4px; }
.notice.success { background: #e6f4ea; }
.notice.error { background: #fdecea; }
.notice.info { background: #e8f0fe; }
form label { display: block; margin: 8px 0; }
#map { width: 100%; height: 900px; }
.stop-icon { font-size: 18px; text-shadow: 0 0 2px #fff; }
"#;

// Stop names come from the dataset and are shown as text, never parsed as HTML.
const MAP_SCRIPT: &str = r#"
function textNode(text) {
  const el = document.createElement('span');
  el.textContent = text;
  return el;
}
const view = JSON.parse(document.getElementById('map-data').textContent);
const map = L.map('map').setView(view.center, view.zoom);
L.tileLayer(view.tile_url, { attribution: view.attribution, subdomains: 'abcd', maxZoom: 20 }).addTo(map);
for (const line of view.lines) {
  L.polyline(line.points, { color: line.color, weight: line.weight }).addTo(map);
}
for (const m of view.markers) {
  const icon = L.divIcon({
    className: 'stop-icon',
    html: `<i class="fa fa-${m.icon}" style="color:${m.color}"></i>`,
    iconSize: [20, 20],
  });
  const marker = L.marker(m.position, { icon }).addTo(map);
  if (m.tooltip) marker.bindTooltip(textNode(m.tooltip));
  if (m.popup) marker.bindPopup(textNode(m.popup));
}
"#;

/// Full page around `body`, with the map below it.
pub fn page(tab: Tab, body: &str, map: &MapView) -> Result<String, serde_json::Error> {
    // keep "</script>" inside names from closing the data block
    let map_json = serde_json::to_string(map)?.replace("</", "<\\/");

    let nav = [
        (Tab::Passengers, "/", "🚗 승객 등록"),
        (Tab::Pairs, "/pairs", "🔀 출발·도착 조합"),
        (Tab::Route, "/route", "🛣️ 경로 탐색"),
    ]
    .iter()
    .map(|(t, href, label)| {
        let class = if *t == tab { r#" class="active""# } else { "" };
        format!(r#"<a href="{href}"{class}>{label}</a>"#)
    })
    .join("");

    Ok(format!(
        r#"<!DOCTYPE html>
<html lang="ko">
<head>
<meta charset="utf-8">
<title>DRT 노선 계획</title>
<link rel="stylesheet" href="https://unpkg.com/leaflet@1.9.4/dist/leaflet.css">
<link rel="stylesheet" href="https://cdnjs.cloudflare.com/ajax/libs/font-awesome/4.7.0/css/font-awesome.min.css">
<style>{STYLE}</style>
</head>
<body>
<nav>{nav}</nav>
{body}
<h3>🗺️ 경로 시각화</h3>
<div id="map"></div>
<script id="map-data" type="application/json">{map_json}</script>
<script src="https://unpkg.com/leaflet@1.9.4/dist/leaflet.js"></script>
<script>{MAP_SCRIPT}</script>
</body>
</html>
"#
    ))
}

fn stop_options(stops: &StopRegistry, selected: &[&str], blank: bool) -> String {
    let mut out = String::new();
    if blank {
        out.push_str(r#"<option value=""></option>"#);
    }
    let options = stops
        .names()
        .map(|name| {
            let sel = if selected.contains(&name) { " selected" } else { "" };
            format!(
                r#"<option value="{}"{sel}>{}</option>"#,
                encode_double_quoted_attribute(name),
                encode_text(name)
            )
        })
        .join("");
    out.push_str(&options);
    out
}

fn notices(notice: Option<&Notice>) -> String {
    notice.map(Notice::render).unwrap_or_default()
}

/// Renders a table with the given headers, escaping every cell.
fn table<const N: usize>(headers: [&str; N], rows: impl Iterator<Item = [String; N]>) -> String {
    let head = headers.iter().map(|h| format!("<th>{h}</th>")).join("");
    let body = rows
        .map(|cells| {
            let tds = cells
                .iter()
                .map(|c| format!("<td>{}</td>", encode_text(c)))
                .join("");
            format!("<tr>{tds}</tr>")
        })
        .join("\n");

    format!("<table><thead><tr>{head}</tr></thead><tbody>\n{body}\n</tbody></table>")
}

pub fn order_table(rows: &[OrderRow]) -> String {
    table(
        ["순서", "예상시간", "정류장", "비고"],
        rows.iter().map(|r| {
            [
                r.sequence.to_string(),
                r.time.clone(),
                r.stop.clone(),
                r.remark.clone(),
            ]
        }),
    )
}

pub fn pair_table(pairs: &[StopPair]) -> String {
    table(
        ["순서", "출발 정류장", "도착 정류장", "직선거리(km)"],
        pairs.iter().map(|p| {
            [
                p.sequence.to_string(),
                p.origin.clone(),
                p.destination.clone(),
                format!("{:.2}", p.distance_km),
            ]
        }),
    )
}

/// Passenger form on the left, stop order on the right.
pub fn passengers_body(stops: &StopRegistry, rows: &[OrderRow], notice: Option<&Notice>) -> String {
    let options = stop_options(stops, &[], false);
    let default_time = default_boarding_time().format(hh_mm::FORMAT);

    let itinerary = if rows.is_empty() {
        Notice::Info(EMPTY_ITINERARY_HINT.to_string()).render()
    } else {
        order_table(rows)
    };

    format!(
        r#"<div class="columns">
<section>
<h3>🚗 승객 등록</h3>
{notice}
<form method="post" action="/passengers">
<label>승객 이름 <input type="text" name="name"></label>
<label>출발 정류장 <select name="start">{options}</select></label>
<label>도착 정류장 <select name="end">{options}</select></label>
<label>승차 시간 <input type="time" name="time" value="{default_time}"></label>
<button type="submit">추가하기</button>
</form>
<form method="post" action="/passengers/clear"><button type="submit">초기화</button></form>
</section>
<section>
<h3>📍 버스 노선표</h3>
{itinerary}
</section>
</div>"#,
        notice = notices(notice),
    )
}

pub fn pairs_body(
    stops: &StopRegistry,
    origins: &[&str],
    destinations: &[&str],
    pairs: &[StopPair],
    notice: Option<&Notice>,
) -> String {
    let table = if pairs.is_empty() {
        String::new()
    } else {
        pair_table(pairs)
    };

    format!(
        r#"<div class="columns">
<section>
<h3>🔀 출발·도착 선택</h3>
{notice}
<form method="get" action="/pairs">
<input type="hidden" name="submitted" value="1">
<label>출발 정류장 <select name="origins" multiple size="8">{origin_options}</select></label>
<label>도착 정류장 <select name="destinations" multiple size="8">{destination_options}</select></label>
<button type="submit">조합 생성</button>
</form>
</section>
<section>
<h3>📍 조합표</h3>
{table}
</section>
</div>"#,
        notice = notices(notice),
        origin_options = stop_options(stops, origins, false),
        destination_options = stop_options(stops, destinations, false),
    )
}

pub fn route_body(
    stops: &StopRegistry,
    selected: &[&str],
    time: &str,
    profile: &str,
    rows: &[OrderRow],
    summary: Option<(f64, f64)>,
    notice: Option<&Notice>,
) -> String {
    let slots = (0..ROUTE_SLOTS)
        .map(|i| {
            let chosen = selected.get(i).copied().into_iter().collect_vec();
            format!(
                r#"<label>{n}번째 정류장 <select name="stops">{options}</select></label>"#,
                n = i + 1,
                options = stop_options(stops, &chosen, true),
            )
        })
        .join("\n");

    let summary = summary
        .map(|(duration, distance)| {
            format!(
                "<p>총 소요시간 {:.0}분 · 총 거리 {:.1}km</p>",
                duration / 60.0,
                distance / 1000.0
            )
        })
        .unwrap_or_default();

    let table = if rows.is_empty() {
        String::new()
    } else {
        order_table(rows)
    };

    format!(
        r#"<div class="columns">
<section>
<h3>🛣️ 경로 탐색</h3>
{notice}
<form method="get" action="/route">
<input type="hidden" name="submitted" value="1">
{slots}
<label>출발 시간 <input type="time" name="time" value="{time}"></label>
<label>이동 수단 <input type="text" name="profile" value="{profile}"></label>
<button type="submit">경로 생성</button>
</form>
</section>
<section>
<h3>📍 예상 도착 시간</h3>
{summary}
{table}
</section>
</div>"#,
        notice = notices(notice),
        time = encode_double_quoted_attribute(time),
        profile = encode_double_quoted_attribute(profile),
    )
}
