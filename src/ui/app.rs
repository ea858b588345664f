use eframe::egui;
use tokio::sync::mpsc;

use crate::common::{SessionCommand, SessionEvent};
use crate::session::sizing::TextMetricsOracle;

use super::components::{chat_area, input_bar};
use super::state::AppState;
use super::style::ChatStyle;

pub struct ChatApp {
    state: AppState,
    command_sender: mpsc::Sender<SessionCommand>,
    event_receiver: mpsc::Receiver<SessionEvent>,
    oracle: TextMetricsOracle,
    style: ChatStyle,
}

impl ChatApp {
    pub fn new(
        _cc: &eframe::CreationContext<'_>,
        command_sender: mpsc::Sender<SessionCommand>,
        event_receiver: mpsc::Receiver<SessionEvent>,
        oracle: TextMetricsOracle,
        style: ChatStyle,
    ) -> Self {
        Self {
            state: AppState::new(),
            command_sender,
            event_receiver,
            oracle,
            style,
        }
    }

    fn handle_session_events(&mut self) {
        while let Ok(event) = self.event_receiver.try_recv() {
            self.state.apply(event);
        }
    }

    fn send_command(&mut self, command: SessionCommand) {
        if let Err(err) = self.command_sender.try_send(command) {
            log::warn!("Failed to send command to session: {err}");
        }
    }
}

impl eframe::App for ChatApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.handle_session_events();

        egui::TopBottomPanel::bottom("input_bar").show(ctx, |ui| {
            ui.add_space(5.0);
            if let Some(content) = input_bar::render(ui, &mut self.state, &self.oracle) {
                self.send_command(SessionCommand::Submit(content));
            }
            ui.add_space(5.0);
        });

        let background = egui::Frame::default()
            .fill(self.style.background)
            .inner_margin(egui::Margin::same(8));
        egui::CentralPanel::default()
            .frame(background)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.heading("Toura Chat");
                    if self.state.busy {
                        ui.spinner();
                    }
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if ui.button("New chat").clicked() {
                            self.send_command(SessionCommand::Reset);
                        }
                    });
                });
                if let Some(notice) = &self.state.notice {
                    ui.colored_label(egui::Color32::DARK_RED, notice);
                }
                ui.separator();

                chat_area::render(ui, &mut self.state, &self.oracle, &self.style);
            });

        ctx.request_repaint();
    }
}
