// THEORY:
// Server-rendered pages. Each page is a pure function of a small, owned model
// struct that a handler fills from a snapshot of the shared state. The leptos
// components only render markup; nothing here touches locks, timers or I/O.
//
// Pages refresh themselves with a `<meta http-equiv="refresh">` tag instead of
// holding a connection open: the live feed every live tick, the map and the
// analytics every ambient tick.

use hazard_watch::core_modules::analytics::{AnalyticsSummary, SeverityBand};
use hazard_watch::core_modules::filter::{FilterParams, TimeWindow, TypeCounts, TypeSelector};
use hazard_watch::core_modules::map::{LandmarkKind, MAP_CENTER, MapLayers, MapMarker, TILE_ATTRIBUTION};
use hazard_watch::core_modules::notice::{Notice, NoticeLevel};
use hazard_watch::core_modules::session::FeedMode;
use hazard_watch::{HazardDetection, HazardType};
use leptos::*;

const STYLE: &str = r#"
:root { --hazard-pothole: 0 84% 60%; --hazard-speed-breaker: 38 92% 50%; --hazard-debris: 142 71% 45%;
        --hazard-vehicle: 217 91% 60%; --hazard-crack: 280 65% 60%; --hazard-animal: 24 95% 53%; }
body { margin: 0; font-family: system-ui, sans-serif; background: #0b1120; color: #22d3ee; }
.app { display: flex; min-height: 100vh; }
.sidebar { width: 220px; padding: 24px; border-right: 1px solid #1e293b; }
.sidebar a { display: block; padding: 8px; color: #94a3b8; text-decoration: none; }
.sidebar a.active { color: #22d3ee; border-left: 2px solid #22d3ee; }
main { flex: 1; padding: 24px; }
.card { background: rgba(15, 23, 42, 0.7); border: 1px solid #1e293b; border-radius: 12px; padding: 16px; margin-bottom: 16px; }
.grid { display: grid; grid-template-columns: repeat(auto-fit, minmax(160px, 1fr)); gap: 12px; }
.muted { color: #67e8f9; font-size: 12px; }
.notice-error { color: #f87171; } .notice-success { color: #4ade80; } .notice-info { color: #38bdf8; }
.bar { height: 12px; background: #22d3ee; border-radius: 4px; }
.video { position: relative; aspect-ratio: 16 / 9; background: #1e293b; border-radius: 8px; overflow: hidden; }
.video.privacy video { filter: blur(4px) brightness(0.85); }
.caption { position: absolute; bottom: 12px; left: 12px; font-family: monospace; font-size: 12px; }
form.inline { display: inline; }
"#;

/// Wraps a rendered body in the HTML document shell.
fn document(title: &str, refresh_secs: Option<u64>, body: &str) -> String {
    let refresh = refresh_secs
        .map(|secs| format!(r#"<meta http-equiv="refresh" content="{secs}">"#))
        .unwrap_or_default();
    format!(
        r#"<!DOCTYPE html><html lang="en"><head><meta charset="utf-8"><title>{title} · Hazard Watch</title>{refresh}<style>{STYLE}</style></head><body>{body}</body></html>"#
    )
}

fn render<F, N>(title: &str, refresh_secs: Option<u64>, view: F) -> String
where
    F: FnOnce() -> N + 'static,
    N: IntoView,
{
    let body = leptos::ssr::render_to_string(view);
    document(title, refresh_secs, &body)
}

/// `application/x-www-form-urlencoded` escaping for query strings built into links.
pub fn query_escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => out.push(byte as char),
            b' ' => out.push('+'),
            other => out.push_str(&format!("%{:02X}", other)),
        }
    }
    out
}

/// The query string that reproduces `params` on `/map` and `/export`.
pub fn filter_query(params: &FilterParams) -> String {
    format!(
        "type={}&severity={}&window={}",
        query_escape(&params.selected_type.to_string()),
        params.severity_threshold,
        params.time_window.key()
    )
}

// --- Shared components ---

const NAV: [(&str, &str); 4] = [
    ("/", "Live Feed"),
    ("/map", "Map View"),
    ("/analytics", "Analytics"),
    ("/system", "System Info"),
];

#[component]
fn Layout(active: &'static str, children: Children) -> impl IntoView {
    view! {
        <div class="app">
            <nav class="sidebar">
                <h2>"RoadSafe AI"</h2>
                <p class="muted">"Hazard Detection System"</p>
                {NAV
                    .into_iter()
                    .map(|(href, label)| {
                        view! { <a href=href class={if href == active { "active" } else { "" }}>{label}</a> }
                    })
                    .collect_view()}
            </nav>
            <main>{children()}</main>
        </div>
    }
}

#[component]
fn PageHeader(title: &'static str, subtitle: &'static str) -> impl IntoView {
    view! {
        <header>
            <h1>{title}</h1>
            <p class="muted">{subtitle}</p>
        </header>
    }
}

#[component]
fn Stat(label: &'static str, value: String) -> impl IntoView {
    view! {
        <div class="card">
            <div class="muted">{label}</div>
            <div class="stat-value">{value}</div>
        </div>
    }
}

#[component]
fn DetectionCard(detection: HazardDetection) -> impl IntoView {
    let tint = format!("border-left: 4px solid {}", detection.hazard_type.color());
    view! {
        <div class="card detection" style=tint>
            <strong>{detection.hazard_type.label()}</strong>
            <span class="muted">{format!(" #{}", detection.id)}</span>
            <div>{format!("Confidence: {}", detection.confidence_percent())}</div>
            <div>{format!("Severity: {:.0}%", detection.severity * 100.0)}</div>
            <div class="muted">{detection.time_of_day()}</div>
        </div>
    }
}

fn notice_class(level: NoticeLevel) -> &'static str {
    match level {
        NoticeLevel::Plain => "notice",
        NoticeLevel::Info => "notice notice-info",
        NoticeLevel::Success => "notice notice-success",
        NoticeLevel::Error => "notice notice-error",
    }
}

#[component]
fn Notices(notices: Vec<Notice>) -> impl IntoView {
    view! {
        <section class="card notices">
            <h3>"Notifications"</h3>
            {notices
                .into_iter()
                .map(|notice| {
                    view! {
                        <div class={notice_class(notice.level)}>
                            <strong>{notice.title}</strong>
                            {notice.description.map(|d| view! { <div class="muted">{d}</div> })}
                        </div>
                    }
                })
                .collect_view()}
        </section>
    }
}

// --- Live feed ---

#[derive(Debug, Clone)]
pub struct LiveModel {
    pub mode: FeedMode,
    pub privacy_mode: bool,
    pub status: &'static str,
    /// Where the page's `<video>` element loads the uploaded file from.
    pub video_url: Option<String>,
    pub latest: Option<HazardDetection>,
    /// Newest first.
    pub recent: Vec<HazardDetection>,
    pub notices: Vec<Notice>,
    pub refresh_secs: u64,
}

pub fn live_page(model: LiveModel) -> String {
    let refresh = model.refresh_secs;
    render("Live Detection Feed", Some(refresh), move || view! { <LivePage model=model/> })
}

#[component]
fn LivePage(model: LiveModel) -> impl IntoView {
    let LiveModel {
        mode,
        privacy_mode,
        status,
        video_url,
        latest,
        recent,
        notices,
        ..
    } = model;
    let camera_on = mode == FeedMode::LiveCamera;
    let has_video = mode == FeedMode::DemoVideo;
    let video_class = if privacy_mode { "video privacy" } else { "video" };
    let privacy_label = if privacy_mode { "Enabled" } else { "Disabled" };

    view! {
        <Layout active="/">
            <PageHeader title="Live Detection Feed" subtitle="AI-powered real-time hazard detection"/>
            {latest.map(|d| {
                view! {
                    <div class="card banner">
                        {format!("New Detection: {} - {}", d.hazard_type, d.confidence_percent())}
                    </div>
                }
            })}
            <section class="card">
                <h3>"Video Stream"</h3>
                <div class="controls">
                    <form class="inline" method="post" action="/privacy">
                        <button type="submit">{if privacy_mode { "Privacy: On" } else { "Privacy: Off" }}</button>
                    </form>
                    {if camera_on {
                        view! {
                            <form class="inline" method="post" action="/media/stop-camera">
                                <button type="submit">"Stop Camera"</button>
                            </form>
                        }
                            .into_view()
                    } else {
                        view! {
                            <form class="inline" method="post" action="/media/camera">
                                <button type="submit">"Open Camera"</button>
                            </form>
                        }
                            .into_view()
                    }}
                    <form class="inline" method="post" action="/media/upload" enctype="multipart/form-data">
                        <input type="file" name="video" accept="video/*"/>
                        <button type="submit">"Upload Video"</button>
                    </form>
                    {has_video
                        .then(|| {
                            view! {
                                <form class="inline" method="post" action="/media/stop-video">
                                    <button type="submit">"Stop Video"</button>
                                </form>
                            }
                        })}
                    <form class="inline" method="post" action="/control/play">
                        <button type="submit">"Play"</button>
                    </form>
                    <form class="inline" method="post" action="/control/pause">
                        <button type="submit">"Pause"</button>
                    </form>
                </div>
                <div class=video_class>
                    {video_url.map(|src| view! { <video src=src autoplay=true muted=true controls=true></video> })}
                    <span class="caption">{mode.caption()}</span>
                </div>
                <div class="grid">
                    <Stat label="Mode" value={mode.label().to_string()}/>
                    <Stat label="Privacy" value={privacy_label.to_string()}/>
                    <Stat label="Status" value={status.to_string()}/>
                </div>
            </section>
            <section class="card">
                <h3>"Recent Detections"</h3>
                {recent.into_iter().map(|detection| view! { <DetectionCard detection=detection/> }).collect_view()}
            </section>
            <Notices notices=notices/>
        </Layout>
    }
}

// --- Map ---

const MAP_WIDTH: f64 = 640.0;
const MAP_HEIGHT: f64 = 400.0;
/// Degrees from the centre to the edge of the drawn area.
const MAP_SPAN_DEG: f64 = 0.012;

/// Projects a coordinate onto the drawn map area, clamped to its edges.
pub fn project(lat: f64, lon: f64) -> (f64, f64) {
    let (center_lat, center_lon) = MAP_CENTER;
    let x = (lon - center_lon) / MAP_SPAN_DEG * (MAP_WIDTH / 2.0) + MAP_WIDTH / 2.0;
    let y = MAP_HEIGHT / 2.0 - (lat - center_lat) / MAP_SPAN_DEG * (MAP_HEIGHT / 2.0);
    (x.clamp(0.0, MAP_WIDTH), y.clamp(0.0, MAP_HEIGHT))
}

#[derive(Debug, Clone)]
pub struct MapModel {
    pub params: FilterParams,
    pub layers: MapLayers,
    /// Counts over the unfiltered store, one per selector card.
    pub counts: TypeCounts,
    pub show_landmarks: bool,
    pub refresh_secs: u64,
}

pub fn map_page(model: MapModel) -> String {
    let refresh = model.refresh_secs;
    render("Smart Road Hazard Dashboard", Some(refresh), move || view! { <MapPage model=model/> })
}

#[component]
fn MapPage(model: MapModel) -> impl IntoView {
    let MapModel {
        params,
        layers,
        counts,
        show_landmarks,
        ..
    } = model;
    let export_href = format!("/export?{}", filter_query(&params));
    let selected = params.selected_type.clone();
    let report_type = selected.hazard_type().map(|t| t.label()).unwrap_or("all");
    let shown = layers.markers.len();

    let selector_cards = std::iter::once(TypeSelector::All)
        .chain(HazardType::ALL.into_iter().map(TypeSelector::from))
        .map(|card| {
            let count = counts.for_selector(&card);
            let active = card == selected;
            let href = format!(
                "/map?{}",
                filter_query(&FilterParams {
                    selected_type: card.clone(),
                    ..params.clone()
                })
            );
            view! {
                <a class={if active { "card selector active" } else { "card selector" }} href=href>
                    <div>{card.to_string()}</div>
                    <strong>{count.to_string()}</strong>
                </a>
            }
        })
        .collect_view();

    let windows = TimeWindow::ALL
        .into_iter()
        .map(|w| view! { <option value={w.key()} selected={w == params.time_window}>{w.label()}</option> })
        .collect_view();

    let type_options = std::iter::once("all")
        .chain(HazardType::ALL.into_iter().map(HazardType::label))
        .map(|name| view! { <option value=name selected={params.selected_type == TypeSelector::parse(name)}>{name}</option> })
        .collect_view();

    view! {
        <Layout active="/map">
            <PageHeader title="Smart Road Hazard Dashboard" subtitle="Filter, map and export detected hazards"/>
            <div class="grid">{selector_cards}</div>
            <form class="card filters" method="get" action="/map">
                <label>"Hazard Type " <select name="type">{type_options}</select></label>
                <label>
                    {format!("Severity >= {:.0}% ", params.severity_threshold * 100.0)}
                    <input type="range" name="severity" min="0" max="1" step="0.05"
                        value={params.severity_threshold.to_string()}/>
                </label>
                <label>"Time Range " <select name="window">{windows}</select></label>
                <label>
                    "Landmarks "
                    <select name="landmarks">
                        <option value="on" selected={show_landmarks}>"Show"</option>
                        <option value="off" selected={!show_landmarks}>"Hide"</option>
                    </select>
                </label>
                <button type="submit">"Apply"</button>
            </form>
            <div class="controls">
                <a class="button" href=export_href download="road_hazard_data.json">"Export JSON"</a>
                <form class="inline" method="post" action="/report">
                    <input type="hidden" name="type" value=report_type/>
                    <button type="submit">"Report Hazard"</button>
                </form>
                <span class="muted">{format!("{} hazards shown", shown)}</span>
            </div>
            <HazardMap layers=layers/>
        </Layout>
    }
}

#[component]
fn HazardMap(layers: MapLayers) -> impl IntoView {
    let MapLayers {
        center,
        zoom,
        tile_url,
        markers,
        landmarks,
    } = layers;
    let legend = HazardType::ALL
        .into_iter()
        .map(|t| view! { <span class="legend" style={format!("color: {}", t.color())}>{t.label()}</span> })
        .collect_view();
    let landmark_legend = [LandmarkKind::Hospital, LandmarkKind::PetrolPump, LandmarkKind::PoliceStation]
        .into_iter()
        .map(|k| view! { <span class="legend">{format!("{} {}", k.glyph(), k.label())}</span> })
        .collect_view();
    let popups = markers.clone();

    view! {
        <section class="card">
            <h3>"Hazard Map View with Landmarks"</h3>
            <div
                id="hazard-map"
                data-center={format!("{},{}", center.0, center.1)}
                data-zoom={zoom.to_string()}
                data-tiles=tile_url
            >
                <svg viewBox={format!("0 0 {} {}", MAP_WIDTH, MAP_HEIGHT)} width="100%">
                    <rect width="100%" height="100%" fill="#111827"></rect>
                    {markers.into_iter().map(marker_view).collect_view()}
                    {landmarks
                        .into_iter()
                        .map(|landmark| {
                            let (x, y) = project(landmark.lat, landmark.lon);
                            view! {
                                <text x={format!("{:.1}", x)} y={format!("{:.1}", y)} font-size="18">
                                    {landmark.kind.glyph()}
                                    <title>{landmark.name}</title>
                                </text>
                            }
                        })
                        .collect_view()}
                </svg>
            </div>
            <p class="muted">{TILE_ATTRIBUTION}</p>
            <div class="legend-row">{legend} {landmark_legend}</div>
            <table class="popups">
                {popups
                    .into_iter()
                    .map(|marker| {
                        view! {
                            <tr id={format!("marker-{}", marker.id)}>
                                {marker.popup.into_iter().map(|line| view! { <td>{line}</td> }).collect_view()}
                            </tr>
                        }
                    })
                    .collect_view()}
            </table>
        </section>
    }
}

fn marker_view(marker: MapMarker) -> impl IntoView {
    let (x, y) = project(marker.lat, marker.lon);
    view! {
        <g class="marker">
            <circle cx={format!("{:.1}", x)} cy={format!("{:.1}", y)} r="14" fill={marker.severity_color} fill-opacity="0.35"></circle>
            <image href={marker.icon_url} x={format!("{:.1}", x - 8.0)} y={format!("{:.1}", y - 8.0)} width="16" height="16"></image>
            <title>{marker.tooltip}</title>
        </g>
    }
}

// --- Analytics ---

#[derive(Debug, Clone)]
pub struct AnalyticsModel {
    pub summary: AnalyticsSummary,
    pub privacy_mode: bool,
    pub refresh_secs: u64,
}

pub fn analytics_page(model: AnalyticsModel) -> String {
    let refresh = model.refresh_secs;
    render("Analytics Dashboard", Some(refresh), move || view! { <AnalyticsPage model=model/> })
}

fn bar_width(count: usize, max: usize) -> String {
    let percent = if max == 0 { 0.0 } else { count as f64 / max as f64 * 100.0 };
    format!("width: {:.0}%", percent)
}

#[component]
fn AnalyticsPage(model: AnalyticsModel) -> impl IntoView {
    let AnalyticsModel {
        summary,
        privacy_mode,
        ..
    } = model;
    let pie = summary.present_types();
    let histogram_max = summary.confidence_histogram.iter().map(|b| b.count).max().unwrap_or(0);
    let series_max = summary.over_time.iter().map(|b| b.detections).max().unwrap_or(0);
    let band_max = summary.severity_bands.iter().map(|(_, n)| *n).max().unwrap_or(0);
    let total = summary.total;
    let privacy_label = if privacy_mode { "Enabled" } else { "Disabled" };

    view! {
        <Layout active="/analytics">
            <PageHeader title="Analytics Dashboard" subtitle="Comprehensive insights and performance metrics"/>
            <div class="grid">
                <Stat label="Total Hazards" value={total.to_string()}/>
                <Stat label="Avg Confidence" value={format!("{:.1}%", summary.average_confidence * 100.0)}/>
                <Stat label="Avg Severity" value={format!("{:.0}%", summary.average_severity * 100.0)}/>
                <Stat label="Privacy Mode" value={privacy_label.to_string()}/>
            </div>
            <section class="card">
                <h3>"Detections Over Time"</h3>
                {summary
                    .over_time
                    .into_iter()
                    .map(|bucket| {
                        view! {
                            <div class="row">
                                <span>{format!("{} ({})", bucket.time, bucket.detections)}</span>
                                <div class="bar" style={bar_width(bucket.detections, series_max)}></div>
                            </div>
                        }
                    })
                    .collect_view()}
            </section>
            <section class="card">
                <h3>"Hazard Distribution"</h3>
                {pie
                    .into_iter()
                    .map(|(hazard_type, count)| {
                        let percent = if total == 0 { 0.0 } else { count as f64 / total as f64 * 100.0 };
                        view! {
                            <div class="row" style={format!("color: {}", hazard_type.color())}>
                                {format!("{} {:.0}%", hazard_type, percent)}
                            </div>
                        }
                    })
                    .collect_view()}
            </section>
            <section class="card">
                <h3>"Confidence Score Distribution"</h3>
                {summary
                    .confidence_histogram
                    .into_iter()
                    .map(|bin| {
                        view! {
                            <div class="row">
                                <span>{format!("{}: {}", bin.range, bin.count)}</span>
                                <div class="bar" style={bar_width(bin.count, histogram_max)}></div>
                            </div>
                        }
                    })
                    .collect_view()}
            </section>
            <section class="card">
                <h3>"Severity Levels"</h3>
                {summary
                    .severity_bands
                    .into_iter()
                    .map(|(band, count)| severity_row(band, count, band_max))
                    .collect_view()}
            </section>
        </Layout>
    }
}

fn severity_row(band: SeverityBand, count: usize, max: usize) -> impl IntoView {
    let style = format!("{}; background: {}", bar_width(count, max), band.color());
    view! {
        <div class="row">
            <span>{format!("{}: {}", band.label(), count)}</span>
            <div class="bar" style=style></div>
        </div>
    }
}

// --- System ---

#[derive(Debug, Clone)]
pub struct SystemModel {
    pub stored: usize,
    pub capacity: usize,
    pub next_id: u64,
    pub live_tick_secs: f64,
    pub ambient_tick_secs: f64,
    pub playing: bool,
    pub camera_device: String,
}

const WORKFLOW: [&str; 5] = ["Camera Feed", "AI Detection", "Privacy Filter", "Geo Mapping", "Real-time Alerts"];

pub fn system_page(model: SystemModel) -> String {
    render("System Overview", None, move || view! { <SystemPage model=model/> })
}

#[component]
fn SystemPage(model: SystemModel) -> impl IntoView {
    let workflow = WORKFLOW
        .into_iter()
        .enumerate()
        .map(|(i, step)| {
            let arrow = if i + 1 < WORKFLOW.len() { " → " } else { "" };
            view! { <span class="step">{format!("{step}{arrow}")}</span> }
        })
        .collect_view();
    let classes = HazardType::ALL
        .into_iter()
        .map(|t| view! { <li style={format!("color: {}", t.color())}>{t.label()}</li> })
        .collect_view();
    let playback = if model.playing { "Running" } else { "Stopped" };

    view! {
        <Layout active="/system">
            <PageHeader title="System Overview" subtitle="Technical specifications and workflow architecture"/>
            <section class="card">
                <h3>"System Workflow"</h3>
                <div>{workflow}</div>
            </section>
            <section class="card">
                <h3>"Detection Classes"</h3>
                <ul>{classes}</ul>
            </section>
            <section class="card">
                <h3>"Engine Status"</h3>
                <div class="grid">
                    <Stat label="Stored Detections" value={format!("{} / {}", model.stored, model.capacity)}/>
                    <Stat label="Next Id" value={model.next_id.to_string()}/>
                    <Stat label="Live Tick" value={format!("{}s", model.live_tick_secs)}/>
                    <Stat label="Ambient Tick" value={format!("{}s", model.ambient_tick_secs)}/>
                    <Stat label="Playback" value={playback.to_string()}/>
                    <Stat label="Camera Device" value={model.camera_device}/>
                </div>
            </section>
        </Layout>
    }
}
