//! The standings table: a header line and one line per car, redrawn every
//! frame.

use crate::columns::ColumnLayout;
use crate::config::Config;
use crate::draw::{Backend, Color, DrawError, FontSpec, Rect, Surface, TextAlign, TextFormat};
use crate::iracing::{Car, SessionInfo, TelemetrySnapshot, Update};
use crate::overlay::{Overlay, StateUpdater, WindowSpec};
use crate::standings::{aggregate, format_lap_time, gap_to_leader};
use crate::text_cache::TextCache;

const NAME: &str = "OverlayStandings";

const XOFF: f32 = 10.0;
const YOFF: f32 = 10.0;
const BADGE_RADIUS: f32 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Columns {
    Position,
    CarNumber,
    Name,
    Delta,
    Best,
    Last,
    License,
    IRating,
    Incidents,
    Pit,
}

#[derive(Debug, Clone)]
struct Style {
    font_size: f32,
    line_spacing: f32,
    self_col: Color,
    buddy_col: Color,
    other_car_col: Color,
    header_col: Color,
    car_number_bg_col: Color,
    car_number_text_col: Color,
    alternate_line_bg_col: Color,
    irating_text_col: Color,
    irating_bg_col: Color,
    license_text_col: Color,
    fastest_lap_col: Color,
    pit_col: Color,
    license_bg_alpha: f32,
    zero_incidents_alpha: f32,
}

impl Style {
    fn from_config(config: &Config) -> Style {
        Style {
            font_size: config.get_float(NAME, "font_size"),
            line_spacing: config.get_float(NAME, "line_spacing"),
            self_col: config.get_color(NAME, "self_col"),
            buddy_col: config.get_color(NAME, "buddy_col"),
            other_car_col: config.get_color(NAME, "other_car_col"),
            header_col: config.get_color(NAME, "header_col"),
            car_number_bg_col: config.get_color(NAME, "car_number_background_col"),
            car_number_text_col: config.get_color(NAME, "car_number_text_col"),
            alternate_line_bg_col: config.get_color(NAME, "alternate_line_background_col"),
            irating_text_col: config.get_color(NAME, "irating_text_col"),
            irating_bg_col: config.get_color(NAME, "irating_background_col"),
            license_text_col: config.get_color(NAME, "license_text_col"),
            fastest_lap_col: config.get_color(NAME, "fastest_lap_col"),
            pit_col: config.get_color(NAME, "pit_col"),
            license_bg_alpha: config.get_float(NAME, "license_background_alpha"),
            zero_incidents_alpha: config.get_float(NAME, "zero_incidents_alpha"),
        }
    }

    fn line_height(&self) -> f32 {
        self.font_size + self.line_spacing
    }

    fn car_col(&self, car: &Car) -> Color {
        if car.is_self {
            self.self_col
        } else if car.is_buddy {
            self.buddy_col
        } else {
            self.other_car_col
        }
    }
}

/// Everything derived from the config that drawing needs. Replaced as a whole
/// on every reconfigure.
struct Resources<B: Backend> {
    text_format: TextFormat<B::Format>,
    text_format_small: TextFormat<B::Format>,
    columns: ColumnLayout<Columns>,
    style: Style,
}

pub struct StandingsOverlay<B: Backend> {
    session: SessionInfo,
    telemetry: TelemetrySnapshot,
    buddies: Vec<String>,
    resources: Option<Resources<B>>,
    text_cache: TextCache<B>,
}

impl<B: Backend> Default for StandingsOverlay<B> {
    fn default() -> Self {
        StandingsOverlay {
            session: SessionInfo::default(),
            telemetry: TelemetrySnapshot::default(),
            buddies: vec![],
            resources: None,
            text_cache: TextCache::new(),
        }
    }
}

impl<B: Backend> StandingsOverlay<B> {
    pub fn new() -> StandingsOverlay<B> {
        StandingsOverlay::default()
    }

    pub fn cached_layouts(&self) -> usize {
        self.text_cache.len()
    }

    /// Builds a complete new set of formats, column widths and colors, and
    /// only then swaps it in and drops every cached layout. A failure leaves
    /// the previous resources and cache untouched.
    pub fn reconfigure(&mut self, surface: &mut dyn Surface<B>, config: &Config) -> Result<(), DrawError> {
        let style = Style::from_config(config);
        let font = FontSpec {
            family: config.get_string(NAME, "font"),
            size: style.font_size,
            weight: config.get_int(NAME, "font_weight"),
        };
        let small_font = FontSpec { size: font.size * 0.8, ..font.clone() };

        let text_format = TextFormat::create(surface, &font)?;
        let text_format_small = TextFormat::create(surface, &small_font)?;

        let font_size = style.font_size;
        let mut width = |text: &str, format: &TextFormat<B::Format>| surface.measure_text(text, format.handle()).width;

        let mut columns = ColumnLayout::new();
        columns.add(Columns::Position, width("P99", &text_format), font_size / 2.0);
        columns.add(Columns::CarNumber, width("#999", &text_format), font_size / 2.0);
        columns.add(Columns::Name, 0.0, font_size / 2.0);
        columns.add(Columns::Pit, width("P.Age", &text_format), font_size / 2.0);
        columns.add(Columns::License, width("A 4.44", &text_format_small), font_size / 6.0);
        columns.add(Columns::IRating, width("999.9k", &text_format_small), font_size / 6.0);
        columns.add(Columns::Incidents, width("999x", &text_format), font_size / 2.0);
        columns.add(Columns::Best, width("99:99.999", &text_format), font_size / 2.0);
        columns.add(Columns::Last, width("99:99.999", &text_format), font_size / 2.0);
        columns.add(Columns::Delta, width("9999.999", &text_format), font_size / 2.0);

        self.buddies = config.get_string_vec("General", "buddies");
        self.session.mark_buddies(&self.buddies);

        let drained = self.text_cache.len();
        self.resources = Some(Resources {
            text_format,
            text_format_small,
            columns,
            style,
        });
        self.text_cache.reset();

        info!("{}: reconfigured with font {} {}pt, dropped {} cached layouts", NAME, font.family, font.size, drained);
        Ok(())
    }

    pub fn render(&mut self, surface: &mut dyn Surface<B>) -> Result<(), DrawError> {
        let resources = match &mut self.resources {
            Some(resources) => resources,
            None => return Ok(()),
        };

        let rows = aggregate(&self.session, &self.telemetry);

        let surface_width = surface.width();
        resources.columns.layout(surface_width - 2.0 * XOFF);

        let Resources { text_format, text_format_small, columns, style } = &*resources;
        let line_height = style.line_height();

        let mut frame = Frame {
            surface,
            cache: &mut self.text_cache,
            columns,
            line_height,
        };

        frame.surface.begin_draw();

        // Headers
        let y = YOFF + line_height / 2.0;
        let headers = [
            (Columns::Position, "Pos.", TextAlign::Center),
            (Columns::CarNumber, "No.", TextAlign::Center),
            (Columns::Name, "Driver", TextAlign::Leading),
            (Columns::Pit, "P.Age", TextAlign::Center),
            (Columns::License, "SR", TextAlign::Center),
            (Columns::IRating, "IR", TextAlign::Center),
            (Columns::Incidents, "Inc.", TextAlign::Trailing),
            (Columns::Best, "Best", TextAlign::Trailing),
            (Columns::Last, "Last", TextAlign::Trailing),
            (Columns::Delta, "Delta", TextAlign::Trailing),
        ];
        for (column, title, align) in headers.iter() {
            if let Some(r) = frame.cell(*column, y) {
                frame.text(r, title, text_format, style.header_col, *align)?;
            }
        }

        // Content
        for (i, row) in rows.iter().enumerate() {
            let y = YOFF + line_height / 2.0 + (i + 1) as f32 * line_height;

            let car = match self.session.car(row.car_idx) {
                Some(car) => car,
                None => continue,
            };
            let live = self.telemetry.car(row.car_idx);
            let car_col = style.car_col(car);

            if i % 2 == 1 && style.alternate_line_bg_col.a > 0.0 {
                let r = Rect::new(0.0, y - line_height / 2.0, surface_width, y + line_height / 2.0);
                frame.surface.fill_rect(r, style.alternate_line_bg_col);
            }

            if let Some(r) = frame.cell(Columns::Position, y) {
                frame.text(r, &format!("P{}", row.position), text_format, car_col, TextAlign::Trailing)?;
            }

            if let Some(r) = frame.cell(Columns::CarNumber, y) {
                let badge = Rect::new(r.left - 2.0, r.top + 1.0, r.right + 2.0, r.bottom - 1.0);
                let badge_col = if car.is_self || car.is_buddy { car_col } else { style.car_number_bg_col };
                frame.surface.fill_rounded_rect(badge, BADGE_RADIUS, badge_col);
                frame.text(r, &format!("#{}", car.car_number), text_format, style.car_number_text_col, TextAlign::Center)?;
            }

            if let Some(r) = frame.cell(Columns::Name, y) {
                frame.text(r, &car.user_name, text_format, car_col, TextAlign::Leading)?;
            }

            if let (Some(r), Some(pit_lap)) = (frame.cell(Columns::Pit, y), car.last_lap_in_pits) {
                let r = r.inset(0.0, 2.0);
                frame.surface.draw_rect(r, style.pit_col);
                frame.text(r, &(live.lap - pit_lap).to_string(), text_format_small, style.pit_col, TextAlign::Center)?;
            }

            if let Some(r) = frame.cell(Columns::License, y) {
                frame.surface.fill_rounded_rect(r.inset(1.0, 1.0), BADGE_RADIUS, car.license_color.with_alpha(style.license_bg_alpha));
                let license = format!("{} {:.1}", car.license_char, car.license_sr);
                frame.text(r, &license, text_format_small, style.license_text_col, TextAlign::Center)?;
            }

            if let Some(r) = frame.cell(Columns::IRating, y) {
                frame.surface.fill_rounded_rect(r.inset(1.0, 1.0), BADGE_RADIUS, style.irating_bg_col);
                let irating = format!("{:.1}k", car.irating as f32 / 1000.0);
                frame.text(r, &irating, text_format_small, style.irating_text_col, TextAlign::Center)?;
            }

            if let Some(r) = frame.cell(Columns::Incidents, y) {
                let col = if car.incident_count != 0 {
                    style.other_car_col
                } else {
                    style.other_car_col.with_alpha(style.other_car_col.a * style.zero_incidents_alpha)
                };
                frame.text(r, &format!("{}x", car.incident_count), text_format, col, TextAlign::Trailing)?;
            }

            if let Some(r) = frame.cell(Columns::Best, y) {
                let col = if row.has_fastest_lap { style.fastest_lap_col } else { style.other_car_col };
                frame.text(r, &format_lap_time(row.best), text_format, col, TextAlign::Trailing)?;
            }

            if let Some(r) = frame.cell(Columns::Last, y) {
                frame.text(r, &format_lap_time(row.last), text_format, style.other_car_col, TextAlign::Trailing)?;
            }

            if let Some(r) = frame.cell(Columns::Delta, y) {
                let gap = gap_to_leader(row, i).to_string();
                frame.text(r, &gap, text_format, style.other_car_col, TextAlign::Trailing)?;
            }
        }

        frame.surface.end_draw()
    }
}

/// Per-frame drawing state: column spans are offset by the outer margin and
/// every string goes through the layout cache.
struct Frame<'a, B: Backend> {
    surface: &'a mut dyn Surface<B>,
    cache: &'a mut TextCache<B>,
    columns: &'a ColumnLayout<Columns>,
    line_height: f32,
}

impl<'a, B: Backend> Frame<'a, B> {
    fn cell(&self, column: Columns, y: f32) -> Option<Rect> {
        self.columns.get(column).map(|c| {
            Rect::new(XOFF + c.text_l, y - self.line_height / 2.0, XOFF + c.text_r, y + self.line_height / 2.0)
        })
    }

    fn text(&mut self, r: Rect, text: &str, format: &TextFormat<B::Format>, color: Color, align: TextAlign) -> Result<(), DrawError> {
        let ycenter = (r.top + r.bottom) / 2.0;
        self.cache.render(&mut *self.surface, text, format, r.left, r.right, ycenter, color, align)
    }
}

impl<B: Backend> StateUpdater for StandingsOverlay<B> {
    fn update_state(self: &mut Self, update: &Update) {
        match update {
            Update::Session(session) => {
                let mut session = session.clone();
                session.carry_over_pit_history(&self.session);
                session.mark_buddies(&self.buddies);
                debug!("{}: session update for {} ({})", NAME, session.track.name, session.track.configuration);
                self.session = session;
            },
            Update::Telemetry(telemetry) => {
                self.session.record_pit_stops(telemetry);
                self.telemetry = telemetry.clone();
            },
        }
    }
}

impl<B: Backend> Overlay<B> for StandingsOverlay<B> {
    fn name(&self) -> &str {
        NAME
    }

    fn window_spec(&self, config: &Config) -> WindowSpec {
        WindowSpec {
            title: "Standings".to_string(),
            width: config.get_float(NAME, "window_width"),
            height: config.get_float(NAME, "window_height"),
        }
    }

    fn on_config_changed(&mut self, surface: &mut dyn Surface<B>, config: &Config) -> Result<(), DrawError> {
        self.reconfigure(surface, config)
    }

    fn on_update(&mut self, surface: &mut dyn Surface<B>) -> Result<(), DrawError> {
        self.render(surface)
    }

    fn can_enable_while_not_driving(&self) -> bool {
        true
    }
}
