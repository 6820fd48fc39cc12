//! The live overlay windows: transparent, undecorated, always-on-top winit
//! windows drawn with skia through skulpin.

use std::collections::HashMap;

use async_std::channel::Receiver;

use skulpin::skia_safe;
use skulpin::winit;
use skulpin::rafx::api::RafxExtents2D;

use winit::event::Event::WindowEvent;
use winit::event::WindowEvent::MouseInput;
use winit::event::MouseButton;
use winit::window::Window;
use winit::window::WindowId;
use winit::event_loop::EventLoop;

use crate::config::{Config, ConfigFile};
use crate::draw::{Backend, Color, DrawError, Extent, FontSpec, Point, Rect, Surface, TextAlign};
use crate::iracing::Update;
use crate::overlay::{fail_fast, Overlay, WindowSpec};
use crate::standings_overlay::StandingsOverlay;

pub struct Skia;

impl Backend for Skia {
    type Format = skia_safe::Font;
    type Layout = SkiaTextLayout;
}

/// A shaped line of text and where it sits inside its layout box.
pub struct SkiaTextLayout {
    blob: Option<skia_safe::TextBlob>,
    offset: Point,
}

pub struct SkiaSurface<'a> {
    canvas: &'a mut skia_safe::Canvas,
    font_mgr: &'a skia_safe::FontMgr,
    width: f32,
}

fn paint(color: Color) -> skia_safe::Paint {
    let mut paint = skia_safe::Paint::new(skia_safe::Color4f::new(color.r, color.g, color.b, color.a), None);
    paint.set_anti_alias(true);
    paint
}

fn sk_rect(rect: Rect) -> skia_safe::Rect {
    skia_safe::Rect::new(rect.left, rect.top, rect.right, rect.bottom)
}

impl<'a> Surface<Skia> for SkiaSurface<'a> {
    fn width(&self) -> f32 {
        self.width
    }

    fn begin_draw(&mut self) {
        self.canvas.clear(skia_safe::Color::from_argb(0, 0, 0, 0));
    }

    fn end_draw(&mut self) -> Result<(), DrawError> {
        Ok(())
    }

    fn create_text_format(&mut self, font: &FontSpec) -> Result<skia_safe::Font, DrawError> {
        let style = skia_safe::FontStyle::new(
            skia_safe::font_style::Weight::from(font.weight),
            skia_safe::font_style::Width::NORMAL,
            skia_safe::font_style::Slant::Upright,
        );
        let typeface = self.font_mgr.match_family_style(&font.family, style)
            .or_else(|| {
                warn!("Font {} not found, falling back to the default typeface", font.family);
                self.font_mgr.legacy_make_typeface(None, style)
            })
            .ok_or_else(|| DrawError::TextFormat {
                family: font.family.clone(),
                reason: "no matching typeface".to_string(),
            })?;

        let mut sk_font = skia_safe::Font::new(typeface, font.size);
        sk_font.set_subpixel(true);
        Ok(sk_font)
    }

    fn create_text_layout(
        &mut self,
        text: &str,
        format: &skia_safe::Font,
        align: TextAlign,
        max_width: f32,
        max_height: f32,
    ) -> Result<SkiaTextLayout, DrawError> {
        let (text_width, _bounds) = format.measure_str(text, None);
        let (_spacing, metrics) = format.metrics();

        let x = match align {
            TextAlign::Leading => 0.0,
            TextAlign::Center => (max_width - text_width) / 2.0,
            TextAlign::Trailing => max_width - text_width,
        };
        // Baseline that centers the glyph box vertically
        let y = max_height / 2.0 - (metrics.ascent + metrics.descent) / 2.0;

        Ok(SkiaTextLayout {
            blob: skia_safe::TextBlob::from_str(text, format),
            offset: Point::new(x, y),
        })
    }

    fn measure_text(&mut self, text: &str, format: &skia_safe::Font) -> Extent {
        let (width, bounds) = format.measure_str(text, None);
        Extent { width, height: bounds.height() }
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        self.canvas.draw_rect(sk_rect(rect), &paint(color));
    }

    fn fill_rounded_rect(&mut self, rect: Rect, radius: f32, color: Color) {
        let rrect = skia_safe::RRect::new_rect_xy(sk_rect(rect), radius, radius);
        self.canvas.draw_rrect(rrect, &paint(color));
    }

    fn draw_rect(&mut self, rect: Rect, color: Color) {
        let mut paint = paint(color);
        paint.set_style(skia_safe::paint::Style::Stroke);
        paint.set_stroke_width(1.0);
        self.canvas.draw_rect(sk_rect(rect), &paint);
    }

    fn draw_text_layout(&mut self, origin: Point, layout: &SkiaTextLayout, clip: Rect, color: Color) {
        if let Some(blob) = &layout.blob {
            self.canvas.save();
            self.canvas.clip_rect(sk_rect(clip), skia_safe::ClipOp::Intersect, true);
            self.canvas.draw_text_blob(
                blob,
                skia_safe::Point::new(origin.x + layout.offset.x, origin.y + layout.offset.y),
                &paint(color),
            );
            self.canvas.restore();
        }
    }
}

pub struct OverlayWindow {
    overlay: Box<dyn Overlay<Skia>>,
    renderer: skulpin::Renderer,
    window: Window,
    enabled: bool,
    config_pending: bool,
}

impl OverlayWindow {
    pub fn new(event_loop: &EventLoop<()>, spec: WindowSpec, overlay: Box<dyn Overlay<Skia>>) -> Result<OverlayWindow, DrawError> {
        let logical_size = winit::dpi::LogicalSize::new(spec.width, spec.height);
        let window = winit::window::WindowBuilder::new()
            .with_title(spec.title)
            .with_inner_size(logical_size)
            .with_decorations(false)
            .with_always_on_top(true)
            .with_transparent(true)
            .with_resizable(true)
            .build(event_loop)
            .map_err(|err| DrawError::Backend(format!("failed to create overlay window: {:?}", err)))?;

        let window_size = window.inner_size();
        let window_extents = RafxExtents2D {
            width: window_size.width,
            height: window_size.height,
        };

        let renderer = skulpin::RendererBuilder::new()
            .coordinate_system(skulpin::CoordinateSystem::Logical)
            .build(&window, window_extents)
            .map_err(|err| DrawError::Backend(format!("failed to create renderer: {:?}", err)))?;

        Ok(OverlayWindow {
            overlay,
            renderer,
            window,
            enabled: false,
            config_pending: false,
        })
    }
}

pub struct Overlays {
    event_loop: EventLoop<()>,
    overlays: HashMap<WindowId, OverlayWindow>,
    state_receiver: Receiver<Update>,
    config_file: ConfigFile,
    config: Config,
}

impl Overlays {
    pub fn new(state_receiver: Receiver<Update>, mut config_file: ConfigFile) -> Overlays {
        let event_loop = EventLoop::<()>::with_user_event();
        let config = config_file.reload_if_changed().unwrap_or_default();

        let standings: Box<dyn Overlay<Skia>> = Box::new(StandingsOverlay::<Skia>::new());
        let spec = standings.window_spec(&config);
        let name = standings.name().to_string();
        let standings_window = match OverlayWindow::new(&event_loop, spec, standings) {
            Ok(window) => window,
            Err(err) => fail_fast(&name, &err),
        };

        let mut window_map = HashMap::new();
        window_map.insert(standings_window.window.id(), standings_window);

        Overlays {
            event_loop,
            overlays: window_map,
            state_receiver,
            config_file,
            config,
        }
    }

    pub fn start_event_loop(self) {
        let Overlays { event_loop, mut overlays, state_receiver, mut config_file, mut config } = self;
        let font_mgr = skia_safe::FontMgr::new();
        let mut is_on_track = false;

        event_loop.run(move |event, _window_target, control_flow| {
            match event {
                winit::event::Event::WindowEvent {
                    event: winit::event::WindowEvent::CloseRequested,
                    ..
                } => *control_flow = winit::event_loop::ControlFlow::Exit,

                winit::event::Event::MainEventsCleared => {
                    let mut updates = Vec::with_capacity(5);
                    while let Ok(update) = state_receiver.try_recv() {
                        if let Update::Telemetry(telemetry) = &update {
                            is_on_track = telemetry.is_on_track;
                        }
                        updates.push(update);
                    }

                    let mut config_changed = false;
                    if let Some(new_config) = config_file.reload_if_changed() {
                        info!("Config changed, reconfiguring overlays");
                        config = new_config;
                        config_changed = true;
                    }

                    for overlay in overlays.values_mut() {
                        for update in &updates {
                            overlay.overlay.update_state(update);
                        }
                        if config_changed {
                            overlay.config_pending = true;
                        }
                        overlay.window.request_redraw();
                    }
                },

                winit::event::Event::RedrawRequested(window_id) => {
                    if let Some(overlay) = overlays.get_mut(&window_id) {
                        let window_size = overlay.window.inner_size();
                        let window_extents = RafxExtents2D {
                            width: window_size.width,
                            height: window_size.height,
                        };
                        let scale_factor = overlay.window.scale_factor();
                        let visible = is_on_track || overlay.overlay.can_enable_while_not_driving();

                        let mut frame_result = Ok(());
                        let draw_result = overlay.renderer.draw(window_extents, scale_factor, |canvas, coordinate_system_helper| {
                            let mut surface = SkiaSurface {
                                canvas,
                                font_mgr: &font_mgr,
                                width: coordinate_system_helper.window_logical_size().width as f32,
                            };

                            if !visible {
                                surface.begin_draw();
                                return;
                            }

                            if !overlay.enabled {
                                if let Err(err) = overlay.overlay.on_enable(&mut surface, &config) {
                                    fail_fast(overlay.overlay.name(), &err);
                                }
                                info!("Enabled overlay {}", overlay.overlay.name());
                                overlay.enabled = true;
                                overlay.config_pending = false;
                            } else if overlay.config_pending {
                                if let Err(err) = overlay.overlay.on_config_changed(&mut surface, &config) {
                                    fail_fast(overlay.overlay.name(), &err);
                                }
                                overlay.config_pending = false;
                            }

                            frame_result = overlay.overlay.on_update(&mut surface);
                        });

                        if let Err(e) = draw_result {
                            error!("Error during draw: {:?}", e);
                            *control_flow = winit::event_loop::ControlFlow::Exit
                        } else if let Err(e) = frame_result {
                            error!("Error drawing {}: {}", overlay.overlay.name(), e);
                            *control_flow = winit::event_loop::ControlFlow::Exit
                        }
                    } else {
                        error!("Unknown window with id {:?}", window_id);
                    }
                },

                WindowEvent { window_id, event: MouseInput { button: MouseButton::Left, .. }, .. } => {
                    if let Some(overlay) = overlays.get(&window_id) {
                        if let Err(err) = overlay.window.drag_window() {
                            warn!("Failed to drag window: {:?}", err);
                        }
                    }
                },

                _ => {}
            }
        });
    }
}
