use std::collections::VecDeque;

use client_core::{Notice, ThemeStore, ViewEvent, ViewState, DELETE_CONFIRMATION_PROMPT};
use crossbeam_channel::{Receiver, Sender};
use shared::domain::Theme;

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::{events::UiEvent, orchestration::apply_view_event};
use crate::ui::theme::{error_color, toggle_label, visuals_for};

pub struct TodoApp {
    cmd_tx: Sender<BackendCommand>,
    ui_rx: Receiver<UiEvent>,
    theme_store: ThemeStore,
    state: ViewState,
    /// Blocking notices, shown one at a time.
    alerts: VecDeque<Notice>,
    status: String,
    backend_error: Option<String>,
    applied_theme: Option<Theme>,
}

impl TodoApp {
    pub fn new(
        cmd_tx: Sender<BackendCommand>,
        ui_rx: Receiver<UiEvent>,
        theme_store: ThemeStore,
    ) -> Self {
        let state = ViewState::new(theme_store.load());
        Self {
            cmd_tx,
            ui_rx,
            theme_store,
            state,
            alerts: VecDeque::new(),
            status: "Connecting...".to_string(),
            backend_error: None,
            applied_theme: None,
        }
    }

    fn apply(&mut self, event: ViewEvent) {
        let notices = apply_view_event(
            &mut self.state,
            event,
            &self.cmd_tx,
            &self.theme_store,
            &mut self.status,
        );
        self.alerts.extend(notices);
    }

    fn apply_all(&mut self, events: Vec<ViewEvent>) {
        for event in events {
            self.apply(event);
        }
    }

    fn process_ui_events(&mut self) {
        while let Ok(event) = self.ui_rx.try_recv() {
            match event {
                UiEvent::Info(message) => self.status = message,
                UiEvent::BackendFailed(message) => {
                    self.status = "Backend unavailable".to_string();
                    self.backend_error = Some(message);
                }
                UiEvent::SubscriptionFailed(err) => {
                    self.status = format!("Live updates interrupted: {err}");
                    self.apply(ViewEvent::SubscriptionFailed(err));
                }
                other => {
                    if let Some(view_event) = other.into_view_event() {
                        self.apply(view_event);
                    }
                }
            }
        }
    }

    fn apply_theme_if_needed(&mut self, ctx: &egui::Context) {
        if self.applied_theme == Some(self.state.theme) {
            return;
        }
        ctx.set_visuals(visuals_for(self.state.theme));
        self.applied_theme = Some(self.state.theme);
    }

    /// A blocking window is up; everything beneath it ignores input.
    fn is_blocked(&self) -> bool {
        !self.alerts.is_empty() || self.state.pending_delete.is_some()
    }

    fn show_top_bar(&mut self, ctx: &egui::Context) {
        let mut events = Vec::new();
        let enabled = !self.is_blocked();
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            ui.add_enabled_ui(enabled, |ui| {
                ui.horizontal(|ui| {
                    ui.heading("To-Do List");
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if ui.button(toggle_label(self.state.theme)).clicked() {
                            events.push(ViewEvent::ToggleTheme);
                        }
                    });
                });
            });
        });
        self.apply_all(events);
    }

    fn show_status_bar(&self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            if let Some(error) = &self.backend_error {
                ui.colored_label(error_color(self.state.theme), error);
            } else {
                ui.small(&self.status);
            }
        });
    }

    fn show_task_list(&mut self, ctx: &egui::Context) {
        let mut events = Vec::new();
        let enabled = !self.is_blocked() && !self.state.overlay_visible();
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.add_enabled_ui(enabled, |ui| {
                self.show_create_form(ui, &mut events);
                ui.separator();
                self.show_task_grid(ui, &mut events);
            });
        });
        self.apply_all(events);
    }

    fn show_create_form(&self, ui: &mut egui::Ui, events: &mut Vec<ViewEvent>) {
        ui.horizontal(|ui| {
            let mut draft = self.state.create_draft.clone();
            let response = ui.add(
                egui::TextEdit::singleline(&mut draft)
                    .hint_text("Enter a task")
                    .desired_width(320.0),
            );
            if response.changed() {
                events.push(ViewEvent::ChangeDraft(draft));
            }
            let entered = response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
            if ui.button("Submit").clicked() || entered {
                events.push(ViewEvent::Submit);
            }
        });
        if let Some(message) = &self.state.validation_message {
            ui.colored_label(error_color(self.state.theme), message);
        }
    }

    fn show_task_grid(&self, ui: &mut egui::Ui, events: &mut Vec<ViewEvent>) {
        if self.state.items.is_empty() {
            ui.weak("No tasks yet.");
            return;
        }

        egui::ScrollArea::vertical().show(ui, |ui| {
            egui::Grid::new("task_grid")
                .num_columns(4)
                .striped(true)
                .spacing([16.0, 6.0])
                .show(ui, |ui| {
                    ui.strong("Task");
                    ui.strong("Mark Done");
                    ui.strong("Delete");
                    ui.strong("Edit");
                    ui.end_row();

                    for item in &self.state.items {
                        let name = egui::RichText::new(&item.name);
                        ui.label(if item.is_done { name.strikethrough() } else { name });

                        let mut done = item.is_done;
                        if ui.checkbox(&mut done, "").changed() {
                            events.push(ViewEvent::ToggleDone {
                                id: item.id.clone(),
                                current: item.is_done,
                            });
                        }
                        if ui.button("Delete").clicked() {
                            events.push(ViewEvent::RequestDelete(item.id.clone()));
                        }
                        if ui.button("Edit").clicked() {
                            events.push(ViewEvent::BeginEdit {
                                id: item.id.clone(),
                                current_name: item.name.clone(),
                            });
                        }
                        ui.end_row();
                    }
                });
        });
    }

    fn show_edit_window(&mut self, ctx: &egui::Context) {
        let Some(current) = self.state.edit_draft() else {
            return;
        };
        let mut draft = current.to_string();
        let mut events = Vec::new();
        let mut open = true;

        egui::Window::new("Edit task")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .enabled(!self.is_blocked())
            .open(&mut open)
            .show(ctx, |ui| {
                let response = ui.add(egui::TextEdit::singleline(&mut draft).desired_width(280.0));
                if response.changed() {
                    events.push(ViewEvent::ChangeEditDraft(draft.clone()));
                }
                let entered =
                    response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
                ui.horizontal(|ui| {
                    if ui.button("Save").clicked() || entered {
                        events.push(ViewEvent::Submit);
                    }
                    if ui.button("Cancel").clicked() {
                        events.push(ViewEvent::CancelEdit);
                    }
                });
            });

        if !open {
            events.push(ViewEvent::CancelEdit);
        }
        self.apply_all(events);
    }

    fn show_confirm_window(&mut self, ctx: &egui::Context) {
        if self.state.pending_delete.is_none() {
            return;
        }
        let mut answer = None;

        egui::Window::new("Confirm")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .enabled(self.alerts.is_empty())
            .show(ctx, |ui| {
                ui.label(DELETE_CONFIRMATION_PROMPT);
                ui.horizontal(|ui| {
                    if ui.button("Yes").clicked() {
                        answer = Some(true);
                    }
                    if ui.button("No").clicked() {
                        answer = Some(false);
                    }
                });
            });

        if let Some(accepted) = answer {
            self.apply(ViewEvent::ConfirmDelete(accepted));
        }
    }

    fn show_alert_window(&mut self, ctx: &egui::Context) {
        let Some(notice) = self.alerts.front() else {
            return;
        };
        let color = notice.is_error().then(|| error_color(self.state.theme));
        let text = notice.to_string();
        let mut dismissed = false;

        egui::Window::new(if color.is_some() { "Error" } else { "Notice" })
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                match color {
                    Some(color) => ui.colored_label(color, &text),
                    None => ui.label(&text),
                };
                if ui.button("OK").clicked() {
                    dismissed = true;
                }
            });

        if dismissed {
            self.alerts.pop_front();
        }
    }
}

impl eframe::App for TodoApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.process_ui_events();
        self.apply_theme_if_needed(ctx);

        self.show_top_bar(ctx);
        self.show_status_bar(ctx);
        self.show_task_list(ctx);
        self.show_edit_window(ctx);
        self.show_confirm_window(ctx);
        self.show_alert_window(ctx);

        ctx.request_repaint_after(std::time::Duration::from_millis(100));
    }
}

impl Drop for TodoApp {
    fn drop(&mut self) {
        let _ = self.cmd_tx.try_send(BackendCommand::Shutdown);
    }
}
