use iced::{
    mouse, time,
    widget::{
        button,
        canvas::{self, Canvas, Frame, Geometry, Path, Stroke},
        column, row, scrollable, text, text_input, Column, Container,
    },
    Alignment, Color, Element, Length, Point, Rectangle, Renderer, Subscription, Task, Theme,
};
use log::error;
use lotcore::model::{FileHandle, ParkingSlot};
use lotcore::sync::InitialOutcome;
use lotcore::{
    ClientConfig, CongestionLevel, DisplayState, HttpBackend, Session, SubmitMode, UploadGate,
};
use std::time::Duration;

const LOW_REMAINING: usize = 5;

fn main() -> iced::Result {
    env_logger::init();
    iced::application(Dashboard::boot, Dashboard::update, Dashboard::view)
        .title(application_title)
        .subscription(application_subscription)
        .theme(application_theme)
        .run()
}

fn application_title(_: &Dashboard) -> String {
    "분석해조 - Parking Occupancy".into()
}

fn application_subscription(_: &Dashboard) -> Subscription<Message> {
    time::every(Duration::from_secs(1)).map(|_| Message::Tick)
}

fn application_theme(_: &Dashboard) -> Theme {
    Theme::Dark
}

/// Backend settings from `LOT_SERVER`, `LOT_SUBMIT_MODE` and `LOT_POLL_MS`.
fn client_config(lookup: impl Fn(&str) -> Option<String>) -> ClientConfig {
    let mut config = ClientConfig::default();
    if let Some(server) = lookup("LOT_SERVER") {
        config.base_url = server;
    }
    match lookup("LOT_SUBMIT_MODE").as_deref() {
        Some("immediate_result") | Some("immediate-result") => {
            config.submit_mode = SubmitMode::ImmediateResult
        }
        Some("acknowledge") => config.submit_mode = SubmitMode::Acknowledge,
        _ => {}
    }
    if let Some(interval) = lookup("LOT_POLL_MS").and_then(|v| v.parse().ok()) {
        config.poll_interval_ms = interval;
    }
    config
}

struct Dashboard {
    session: Option<Session<HttpBackend>>,
    gate: UploadGate,
    path_input: String,
    mime_input: String,
    display: Option<DisplayState>,
    stream_url: Option<String>,
    submitting: bool,
    status: String,
    history: Vec<String>,
}

#[derive(Debug, Clone)]
enum Message {
    Tick,
    PathChanged(String),
    MimeChanged(String),
    SelectFile,
    Analyze,
    Analyzed(Result<InitialOutcome, String>),
}

impl Dashboard {
    fn boot() -> (Self, Task<Message>) {
        let config = client_config(|key| std::env::var(key).ok());
        let (session, status) = match HttpBackend::new(config.clone()) {
            Ok(backend) => (
                Some(Session::new(config.clone(), backend)),
                format!("Backend: {}", config.base_url),
            ),
            Err(err) => {
                error!("cannot build HTTP client: {err}");
                (None, format!("HTTP client error: {err}"))
            }
        };

        (
            Dashboard {
                session,
                gate: UploadGate::new(),
                path_input: String::new(),
                mime_input: String::new(),
                display: None,
                stream_url: None,
                submitting: false,
                status,
                history: Vec::new(),
            },
            Task::none(),
        )
    }

    fn update(state: &mut Self, message: Message) -> Task<Message> {
        match message {
            Message::Tick => {
                if let Some(session) = state.session.clone() {
                    let latest = session.display();
                    let changed = state
                        .display
                        .as_ref()
                        .map_or(true, |shown| shown.revision != latest.revision);
                    if changed && latest.revision > 0 {
                        state.push_history(format!(
                            "rev {}: {} vehicles, {} empty, {}",
                            latest.revision,
                            latest.snapshot.vehicle_count(),
                            latest.snapshot.empty_slot_ids().len(),
                            latest.congestion
                        ));
                    }
                    state.display = Some(latest);
                    state.stream_url = session.stream_url();
                }
                Task::none()
            }
            Message::PathChanged(value) => {
                state.path_input = value;
                Task::none()
            }
            Message::MimeChanged(value) => {
                state.mime_input = value;
                Task::none()
            }
            Message::SelectFile => {
                let path = state.path_input.trim();
                let handle = (!path.is_empty()).then(|| {
                    let handle = FileHandle::from_path(path);
                    match state.mime_input.trim() {
                        "" => handle,
                        mime => handle.with_mime(mime),
                    }
                });
                state.status = match state.gate.select_file(handle) {
                    Some(media) => format!(
                        "✅ 업로드한 파일 확인: {} ({:?}, {})",
                        media.name(),
                        media.kind(),
                        media.preview_url()
                    ),
                    None => "Enter a file path first".into(),
                };
                Task::none()
            }
            Message::Analyze => {
                let Some(session) = state.session.clone() else {
                    return Task::none();
                };
                if state.submitting {
                    return Task::none();
                }
                match state.gate.request_upload() {
                    Ok(upload) => {
                        state.submitting = true;
                        state.status = format!("Submitting {}...", upload.name);
                        Task::perform(
                            async move { session.submit(&upload).await.map_err(|e| e.to_string()) },
                            Message::Analyzed,
                        )
                    }
                    Err(err) => {
                        state.status = err.to_string();
                        Task::none()
                    }
                }
            }
            Message::Analyzed(Ok(outcome)) => {
                state.submitting = false;
                state.status = outcome
                    .acknowledgement
                    .clone()
                    .unwrap_or_else(|| "분석 완료".into());
                state.push_history(format!("Session armed, stream at {}", outcome.stream_url));
                state.stream_url = Some(outcome.stream_url);
                state.display = Some(outcome.state);
                Task::none()
            }
            Message::Analyzed(Err(err)) => {
                state.submitting = false;
                state.status = format!("분석 중 오류 발생: {err}");
                state.push_history("Submit failed".into());
                Task::none()
            }
        }
    }

    fn view(state: &Self) -> Element<'_, Message> {
        let can_submit = state.session.is_some() && !state.submitting;

        let selected_info = match state.gate.selected() {
            Some(media) => text(format!("Selected: {} ({:?})", media.name(), media.kind())),
            None => text("여기에 영상 미리보기가 표시됩니다."),
        }
        .size(14);

        let stream_info = match &state.stream_url {
            Some(url) => text(format!("Live stream: {url}")),
            None => text("Live stream: not armed"),
        }
        .size(14);

        let upload_column = column![
            text("영상 분석").size(26),
            text_input("File path (mp4, avi, jpg, png...)", &state.path_input)
                .on_input(Message::PathChanged)
                .padding(6),
            text_input("MIME type (optional)", &state.mime_input)
                .on_input(Message::MimeChanged)
                .padding(6),
            row![
                button("🎥 영상 선택").on_press(Message::SelectFile).padding(10),
                button("⏱ 분석 시작")
                    .on_press_maybe(can_submit.then_some(Message::Analyze))
                    .padding(10),
            ]
            .spacing(10),
            selected_info,
            stream_info,
            text(&state.status).size(14),
        ]
        .spacing(10)
        .padding(16)
        .width(Length::Fixed(360.0));

        let slots = state
            .display
            .as_ref()
            .map(|display| display.snapshot.slots().to_vec())
            .unwrap_or_default();

        let (capacity, congestion) = match &state.display {
            Some(display) => {
                let remaining = display.snapshot.empty_slot_ids().len();
                (
                    row![
                        text(format!("총 공간 : {}대 / ", display.snapshot.total_slots())).size(18),
                        text(format!("남은 공간 : {remaining}대"))
                            .size(18)
                            .color(remaining_color(remaining)),
                    ],
                    text(format!("현재 혼잡도: {}", display.congestion))
                        .size(18)
                        .color(congestion_color(display.congestion)),
                )
            }
            None => (
                row![text("총 공간 : -").size(18)],
                text("현재 혼잡도: -").size(18),
            ),
        };

        let vehicle_count = state
            .display
            .as_ref()
            .map(|display| display.snapshot.vehicle_count())
            .unwrap_or(0);

        let empty_ids = state
            .display
            .as_ref()
            .map(|display| {
                display
                    .snapshot
                    .empty_slot_ids()
                    .iter()
                    .map(|id| id.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            })
            .filter(|ids| !ids.is_empty())
            .unwrap_or_else(|| "none".into());

        let history_list = if state.history.is_empty() {
            Column::new().push(text("No activity yet").size(12))
        } else {
            state
                .history
                .iter()
                .rev()
                .fold(Column::new().spacing(4), |col, entry| {
                    col.push(text(entry.clone()).size(12))
                })
        };

        let occupancy_column = column![
            text("🅿️ 주차장 공간 현황").size(26),
            capacity,
            congestion,
            text(format!("🚗 현재 차량 수: {vehicle_count}대")).size(18),
            Canvas::new(SlotMap { slots })
                .width(Length::Fill)
                .height(Length::Fixed(280.0)),
            text(format!("Empty slots: {empty_ids}")).size(14),
            text("Activity log").size(16),
            Container::new(scrollable(history_list).height(Length::Fixed(120.0))).padding(6),
        ]
        .spacing(10)
        .padding(16)
        .width(Length::Fill);

        let layout = row![upload_column, occupancy_column]
            .spacing(20)
            .align_y(Alignment::Start)
            .padding(20);

        Container::new(layout)
            .width(Length::Fill)
            .height(Length::Fill)
            .center_y(Length::Fill)
            .into()
    }

    fn push_history(&mut self, entry: String) {
        self.history.push(entry);
        if self.history.len() > 20 {
            self.history.remove(0);
        }
    }
}

fn congestion_color(level: CongestionLevel) -> Color {
    match level {
        CongestionLevel::Clear => Color::from_rgb(0.3, 0.8, 0.4),
        CongestionLevel::Congested => Color::from_rgb(0.95, 0.7, 0.2),
        CongestionLevel::Critical => Color::from_rgb(0.95, 0.3, 0.25),
    }
}

/// Red once the lot is down to its last few spaces.
fn remaining_color(remaining: usize) -> Color {
    if remaining <= LOW_REMAINING {
        Color::from_rgb(0.95, 0.3, 0.25)
    } else {
        Color::from_rgb(0.3, 0.8, 0.4)
    }
}

/// Maps slot outlines into a `width` x `height` area, keeping aspect ratio.
/// Slots without readable geometry are laid out as a grid instead.
fn layout_slots(slots: &[ParkingSlot], width: f32, height: f32) -> Vec<(bool, Vec<Point>)> {
    let outlines: Vec<(bool, Vec<(f32, f32)>)> = slots
        .iter()
        .filter_map(|slot| {
            slot.geometry
                .points()
                .filter(|points| points.len() >= 3)
                .map(|points| (slot.occupied, points))
        })
        .collect();

    if outlines.len() == slots.len() && !outlines.is_empty() {
        let (mut min_x, mut min_y) = (f32::INFINITY, f32::INFINITY);
        let (mut max_x, mut max_y) = (f32::NEG_INFINITY, f32::NEG_INFINITY);
        for (x, y) in outlines.iter().flat_map(|(_, points)| points.iter()) {
            min_x = min_x.min(*x);
            min_y = min_y.min(*y);
            max_x = max_x.max(*x);
            max_y = max_y.max(*y);
        }
        let margin = 8.0;
        let scale = ((width - 2.0 * margin) / (max_x - min_x).max(1.0))
            .min((height - 2.0 * margin) / (max_y - min_y).max(1.0));
        return outlines
            .into_iter()
            .map(|(occupied, points)| {
                let mapped = points
                    .into_iter()
                    .map(|(x, y)| {
                        Point::new(margin + (x - min_x) * scale, margin + (y - min_y) * scale)
                    })
                    .collect();
                (occupied, mapped)
            })
            .collect();
    }

    let columns = (slots.len() as f32).sqrt().ceil().max(1.0) as usize;
    let rows = slots.len().div_ceil(columns).max(1);
    let cell_w = width / columns as f32;
    let cell_h = height / rows as f32;
    slots
        .iter()
        .enumerate()
        .map(|(idx, slot)| {
            let x = (idx % columns) as f32 * cell_w + 2.0;
            let y = (idx / columns) as f32 * cell_h + 2.0;
            let (w, h) = ((cell_w - 4.0).max(1.0), (cell_h - 4.0).max(1.0));
            (
                slot.occupied,
                vec![
                    Point::new(x, y),
                    Point::new(x + w, y),
                    Point::new(x + w, y + h),
                    Point::new(x, y + h),
                ],
            )
        })
        .collect()
}

#[derive(Clone)]
struct SlotMap {
    slots: Vec<ParkingSlot>,
}

impl canvas::Program<Message> for SlotMap {
    type State = ();

    fn draw(
        &self,
        _state: &Self::State,
        renderer: &Renderer,
        _theme: &Theme,
        bounds: Rectangle,
        _cursor: mouse::Cursor,
    ) -> Vec<Geometry> {
        let mut frame = Frame::new(renderer, bounds.size());
        frame.fill_rectangle(
            Point::ORIGIN,
            bounds.size(),
            Color::from_rgb(0.05, 0.05, 0.05),
        );

        for (occupied, outline) in layout_slots(&self.slots, bounds.width, bounds.height) {
            let color = if occupied {
                Color::from_rgb(0.9, 0.25, 0.2)
            } else {
                Color::from_rgb(0.2, 0.85, 0.35)
            };
            let path = Path::new(|builder| {
                for (i, point) in outline.iter().enumerate() {
                    if i == 0 {
                        builder.move_to(*point);
                    } else {
                        builder.line_to(*point);
                    }
                }
                builder.close();
            });
            frame.fill(&path, Color { a: 0.35, ..color });
            frame.stroke(&path, Stroke::default().with_width(2.0).with_color(color));
        }

        vec![frame.into_geometry()]
    }
}
