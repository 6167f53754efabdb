#[cfg(feature = "gui")]
use eframe::egui;

#[cfg(feature = "gui")]
use midiport::{Config, InboundMessage, MidirHost, PortManager};

#[cfg(feature = "gui")]
use parking_lot::Mutex;
#[cfg(feature = "gui")]
use std::{
    collections::VecDeque,
    sync::Arc,
    time::{Duration, Instant},
};

#[cfg(feature = "gui")]
const MAX_LOG_LINES: usize = 200;

#[cfg(feature = "gui")]
const STATE_POLL_INTERVAL: Duration = Duration::from_secs(1);

#[cfg(feature = "gui")]
fn main() -> Result<(), eframe::Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([720.0, 640.0])
            .with_title("midiport - MIDI Monitor"),
        ..Default::default()
    };

    eframe::run_native(
        "midiport",
        options,
        Box::new(|cc| Ok(Box::new(MonitorApp::new(cc.egui_ctx.clone())))),
    )
}

#[cfg(not(feature = "gui"))]
fn main() {
    eprintln!("This binary requires the 'gui' feature to be enabled");
    std::process::exit(1);
}

#[cfg(feature = "gui")]
struct MonitorApp {
    manager: PortManager<MidirHost>,
    received: Arc<Mutex<VecDeque<InboundMessage>>>,

    // UI state
    status: String,
    input_names: Vec<String>,
    output_names: Vec<String>,
    input_connected: Vec<bool>,
    last_state_poll: Instant,
    selected_input: Option<usize>,
    selected_output: Option<usize>,
    note: u8,
}

#[cfg(feature = "gui")]
impl MonitorApp {
    fn new(ctx: egui::Context) -> Self {
        let config = Config::from_env();
        let mut manager = PortManager::midir(config);

        let received = Arc::new(Mutex::new(VecDeque::new()));
        let sink = Arc::clone(&received);
        manager.set_message_handler(move |message| {
            let mut lines = sink.lock();
            if lines.len() == MAX_LOG_LINES {
                lines.pop_front();
            }
            lines.push_back(message);
            ctx.request_repaint();
        });

        let status = match futures::executor::block_on(manager.initialize()) {
            Ok(()) => "MIDI ready".to_string(),
            Err(e) => e.to_string(),
        };

        let mut app = Self {
            manager,
            received,
            status,
            input_names: vec![],
            output_names: vec![],
            input_connected: vec![],
            last_state_poll: Instant::now(),
            selected_input: None,
            selected_output: None,
            note: 60, // Middle C
        };
        app.reload_ports();
        app
    }

    fn reload_ports(&mut self) {
        self.input_names = self.manager.input_name_list();
        self.output_names = self.manager.output_name_list();
        self.poll_connection_state();
    }

    fn poll_connection_state(&mut self) {
        self.input_connected = (0..self.manager.input_count())
            .map(|i| self.manager.is_input_port_open(i))
            .collect();
        self.last_state_poll = Instant::now();
    }

    fn refresh(&mut self) {
        // Indices are about to change; re-select by id afterwards
        let input = self.selected_input.and_then(|i| self.manager.input_id(i));
        let output = self.selected_output.and_then(|i| self.manager.output_id(i));

        self.manager.refresh_devices();
        self.reload_ports();

        self.selected_input = input.as_ref().and_then(|id| self.manager.find_input(id));
        self.selected_output = output.as_ref().and_then(|id| self.manager.find_output(id));
        if input.is_some() && self.selected_input.is_none() {
            self.manager.close_input_port();
        }
        if output.is_some() && self.selected_output.is_none() {
            self.manager.close_output_port();
        }
    }

    fn port_picker(
        ui: &mut egui::Ui,
        id: &str,
        names: &[String],
        selected: Option<usize>,
    ) -> Option<usize> {
        let mut picked = None;
        egui::ComboBox::from_id_source(id)
            .selected_text(
                selected
                    .and_then(|i| names.get(i))
                    .map(|s| s.as_str())
                    .unwrap_or("Select port..."),
            )
            .show_ui(ui, |ui| {
                for (i, name) in names.iter().enumerate() {
                    if ui.selectable_label(selected == Some(i), name).clicked() {
                        picked = Some(i);
                    }
                }
            });
        picked
    }
}

#[cfg(feature = "gui")]
impl eframe::App for MonitorApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Devices can be unplugged without a refresh
        if self.last_state_poll.elapsed() >= STATE_POLL_INTERVAL {
            self.poll_connection_state();
        }
        ctx.request_repaint_after(STATE_POLL_INTERVAL);

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("midiport - MIDI Monitor");
            ui.label(self.status.as_str());
            ui.add_space(10.0);

            if ui.button("⟳ Refresh devices").clicked() {
                self.refresh();
            }

            ui.add_space(10.0);

            // MIDI Input selection
            ui.horizontal(|ui| {
                ui.label("MIDI Input:");
                if self.input_names.is_empty() {
                    ui.label("No MIDI inputs available");
                } else if let Some(i) =
                    Self::port_picker(ui, "input", &self.input_names, self.selected_input)
                {
                    self.manager.open_input_port(i);
                    self.selected_input = self.manager.is_input_bound(i).then_some(i);
                }
                if self.selected_input.is_some() && ui.button("Close").clicked() {
                    self.manager.close_input_port();
                    self.selected_input = None;
                }
                if let Some(i) = self.selected_input {
                    if !self.input_connected.get(i).copied().unwrap_or(false) {
                        ui.colored_label(egui::Color32::YELLOW, "disconnected");
                    }
                }
            });

            // MIDI Output selection
            ui.horizontal(|ui| {
                ui.label("MIDI Output:");
                if self.output_names.is_empty() {
                    ui.label("No MIDI outputs available");
                } else if let Some(i) =
                    Self::port_picker(ui, "output", &self.output_names, self.selected_output)
                {
                    self.manager.open_output_port(i);
                    self.selected_output = self.manager.is_output_bound(i).then_some(i);
                }
                if self.selected_output.is_some() && ui.button("Close").clicked() {
                    self.manager.close_output_port();
                    self.selected_output = None;
                }
            });

            ui.add_space(10.0);

            // Test note
            ui.horizontal(|ui| {
                ui.label("Note:");
                ui.add(egui::Slider::new(&mut self.note, 0..=127));
                ui.label(format!("({})", midi_note_name(self.note)));

                let enabled = self.selected_output.is_some();
                if ui.add_enabled(enabled, egui::Button::new("Note On")).clicked() {
                    self.manager.send_message(&[0x90, self.note, 100]);
                }
                if ui.add_enabled(enabled, egui::Button::new("Note Off")).clicked() {
                    self.manager.send_message(&[0x80, self.note, 0]);
                }
            });

            ui.separator();
            ui.horizontal(|ui| {
                ui.label("Received:");
                if ui.button("Clear").clicked() {
                    self.received.lock().clear();
                }
            });

            egui::ScrollArea::vertical()
                .stick_to_bottom(true)
                .show(ui, |ui| {
                    for message in self.received.lock().iter() {
                        let json = message.to_json().unwrap_or_default();
                        ui.monospace(format!("{:<40} {}", json, describe(&message.data)));
                    }
                });

            if self.selected_input.is_none() {
                ui.colored_label(egui::Color32::YELLOW, "⚠ No MIDI input open");
            }
        });
    }
}

#[cfg(feature = "gui")]
fn midi_note_name(note: u8) -> String {
    let note_names = ["C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B"];
    let octave = (note / 12) as i32 - 1;
    let note_index = (note % 12) as usize;
    format!("{}{}", note_names[note_index], octave)
}

/// Human-readable summary of common channel messages, for display only
#[cfg(feature = "gui")]
fn describe(data: &[u8]) -> String {
    let Some(&status) = data.first() else {
        return String::new();
    };
    let channel = (status & 0x0F) + 1;
    match (status & 0xF0, data.get(1), data.get(2)) {
        (0x90, Some(&note), Some(&velocity)) if velocity > 0 => {
            format!("Note On  ch{} {} vel {}", channel, midi_note_name(note), velocity)
        }
        (0x80 | 0x90, Some(&note), Some(_)) => {
            format!("Note Off ch{} {}", channel, midi_note_name(note))
        }
        (0xB0, Some(&cc), Some(&value)) => format!("CC       ch{} #{} = {}", channel, cc, value),
        (0xE0, Some(&lsb), Some(&msb)) => format!(
            "Pitch    ch{} {}",
            channel,
            (((msb as i32) << 7) | lsb as i32) - 8192
        ),
        _ if status == 0xF0 => format!("SysEx    {} bytes", data.len()),
        _ => String::new(),
    }
}
