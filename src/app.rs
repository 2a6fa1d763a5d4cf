use anyhow::{anyhow, Context as _, Result};
use eframe::egui;
use rfd::FileDialog;
use std::{
    fs,
    path::PathBuf,
    sync::{
        mpsc::{Receiver, Sender, TryRecvError},
        Arc,
    },
    thread,
};
use tracing::{error, info, warn};

use crate::{
    config::AppConfig,
    export::{save_all, save_single, write_archive, ARCHIVE_NAME},
    models::{ProcessedImage, Settings, SizePreset},
    processor::process_image,
    utils::open_folder,
};

const PROCESS_FAILED: &str = "Failed to process image. Please try again.";
const PREVIEW_SIDE: u32 = 160;

pub enum WorkerEvent {
    Progress { done: usize, total: usize },
    Finished {
        results: Vec<ProcessedImage>,
        previews: Vec<egui::ColorImage>,
    },
    Failed(String),
}

struct Preview {
    result: ProcessedImage,
    texture: egui::TextureHandle,
}

#[derive(Default)]
struct NewSizeForm {
    open: bool,
    label: String,
    width: String,
    height: String,
    error: Option<String>,
}

pub struct ResizerApp {
    config_path: PathBuf,
    settings: Settings,
    sizes: Vec<SizePreset>,
    source_path: Option<PathBuf>,
    source_bytes: Option<Arc<Vec<u8>>>,
    previews: Vec<Preview>,
    output_dir: Option<PathBuf>,
    status: String,
    error: Option<String>,
    progress: f32,
    processing: bool,
    worker_thread: Option<thread::JoinHandle<()>>,
    progress_receiver: Receiver<WorkerEvent>,
    new_size: NewSizeForm,
}

impl ResizerApp {
    pub fn new(config: AppConfig, config_path: PathBuf) -> Self {
        Self {
            config_path,
            settings: config.settings,
            sizes: config.sizes,
            source_path: None,
            source_bytes: None,
            previews: Vec::new(),
            output_dir: None,
            status: "Select an image to start".to_string(),
            error: None,
            progress: 0.0,
            processing: false,
            worker_thread: None,
            progress_receiver: std::sync::mpsc::channel().1,
            new_size: NewSizeForm::default(),
        }
    }

    fn select_image(&mut self) {
        let Some(path) = FileDialog::new()
            .add_filter("Images", &["png", "jpg", "jpeg", "gif"])
            .pick_file()
        else {
            return;
        };

        match read_source(&path, &self.settings) {
            Ok(bytes) => {
                info!("Selected {}", path.display());
                self.source_path = Some(path);
                self.source_bytes = Some(Arc::new(bytes));
                self.start_processing();
            }
            Err(e) => {
                warn!("Rejected {}: {:#}", path.display(), e);
                self.error = Some(e.to_string());
            }
        }
    }

    fn start_processing(&mut self) {
        if self.processing {
            return;
        }
        let Some(bytes) = self.source_bytes.clone() else {
            return;
        };

        self.processing = true;
        self.error = None;
        self.progress = 0.0;
        self.status = "Processing your image...".to_string();

        let (sender, receiver) = std::sync::mpsc::channel();
        self.progress_receiver = receiver;

        let sizes = self.sizes.clone();
        let settings = self.settings.clone();
        self.worker_thread = Some(thread::spawn(move || {
            run_worker(&bytes, &sizes, &settings, sender);
        }));
    }

    fn on_sizes_changed(&mut self) {
        if let Err(e) = AppConfig::save(
            &AppConfig {
                settings: self.settings.clone(),
                sizes: self.sizes.clone(),
            },
            &self.config_path,
        ) {
            warn!("Could not save config: {}", e);
        }

        if self.source_bytes.is_some() {
            self.start_processing();
        }
    }

    fn add_custom_size(&mut self) {
        let form = &mut self.new_size;
        let parsed = parse_dimension(&form.width)
            .zip(parse_dimension(&form.height))
            .ok_or_else(|| anyhow!("Width and height must be whole numbers"))
            .and_then(|(width, height)| {
                SizePreset::custom(&form.label, width, height).map_err(anyhow::Error::from)
            });

        match parsed {
            Ok(preset) => {
                *form = NewSizeForm::default();
                self.sizes.push(preset);
                self.on_sizes_changed();
            }
            Err(e) => form.error = Some(e.to_string()),
        }
    }

    fn results(&self) -> Vec<ProcessedImage> {
        self.previews.iter().map(|p| p.result.clone()).collect()
    }

    fn pick_output_dir(&mut self) -> Option<PathBuf> {
        let mut dialog = FileDialog::new();
        if let Some(dir) = &self.output_dir {
            dialog = dialog.set_directory(dir);
        }
        let dir = dialog.pick_folder()?;
        self.output_dir = Some(dir.clone());
        Some(dir)
    }

    fn save_one(&mut self, index: usize) {
        let Some(dir) = self.pick_output_dir() else {
            return;
        };
        let result = &self.previews[index].result;
        self.report(save_single(result, &dir).map(|path| format!("Saved {}", path.display())));
    }

    fn save_everything(&mut self) {
        let Some(dir) = self.pick_output_dir() else {
            return;
        };
        let results = self.results();
        self.report(
            save_all(&results, &dir)
                .map(|paths| format!("Saved {} images to {}", paths.len(), dir.display())),
        );
    }

    fn download_zip(&mut self) {
        let mut dialog = FileDialog::new()
            .add_filter("Zip archive", &["zip"])
            .set_file_name(ARCHIVE_NAME);
        if let Some(dir) = &self.output_dir {
            dialog = dialog.set_directory(dir);
        }
        let Some(path) = dialog.save_file() else {
            return;
        };
        if let Some(parent) = path.parent() {
            self.output_dir = Some(parent.to_path_buf());
        }
        let results = self.results();
        self.report(write_archive(&results, &path).map(|_| format!("Wrote {}", path.display())));
    }

    fn report(&mut self, outcome: crate::error::Result<String>) {
        match outcome {
            Ok(message) => {
                self.status = message;
                self.error = None;
            }
            Err(e) => {
                error!("Save failed: {}", e);
                self.error = Some(e.to_string());
            }
        }
    }

    fn drain_events(&mut self, ctx: &egui::Context) {
        loop {
            match self.progress_receiver.try_recv() {
                Ok(event) => self.apply_event(event, ctx),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    // Every event is drained by now, so a run still marked
                    // active means the worker died before reporting.
                    if self.processing {
                        error!("Worker exited without reporting a result");
                        self.processing = false;
                        self.status = "Ready".to_string();
                        self.error = Some(PROCESS_FAILED.to_string());
                    }
                    break;
                }
            }
        }

        if let Some(handle) = self.worker_thread.take() {
            if !handle.is_finished() {
                self.worker_thread = Some(handle);
            }
        }
    }

    fn apply_event(&mut self, event: WorkerEvent, ctx: &egui::Context) {
        match event {
            WorkerEvent::Progress { done, total } => {
                self.progress = done as f32 / total.max(1) as f32;
                self.status = format!("Processing | {} of {} sizes", done, total);
            }
            WorkerEvent::Finished { results, previews } => {
                self.previews = results
                    .into_iter()
                    .zip(previews)
                    .map(|(result, preview)| {
                        let texture = ctx.load_texture(
                            result.file_name(),
                            preview,
                            egui::TextureOptions::default(),
                        );
                        Preview { result, texture }
                    })
                    .collect();
                self.processing = false;
                self.progress = 1.0;
                self.error = None;
                self.status = format!("Done! {} images ready", self.previews.len());
            }
            WorkerEvent::Failed(message) => {
                error!("Processing failed: {}", message);
                self.previews.clear();
                self.processing = false;
                self.status = "Ready".to_string();
                self.error = Some(PROCESS_FAILED.to_string());
            }
        }
    }

    fn sizes_panel(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.heading("Sizes");
            if ui.button("➕ Add Custom Size").clicked() {
                self.new_size.open = !self.new_size.open;
            }
        });

        let mut changed = false;
        let mut remove = None;
        for (index, size) in self.sizes.iter_mut().enumerate() {
            let text = size.as_string();
            ui.horizontal(|ui| {
                changed |= ui.checkbox(&mut size.enabled, text).changed();
                if ui.small_button("✖").clicked() {
                    remove = Some(index);
                }
            });
        }
        if let Some(index) = remove {
            self.sizes.remove(index);
            changed = true;
        }

        if self.new_size.open {
            ui.horizontal(|ui| {
                ui.add(
                    egui::TextEdit::singleline(&mut self.new_size.label)
                        .hint_text("Label (e.g., Square)")
                        .desired_width(160.0),
                );
                ui.add(
                    egui::TextEdit::singleline(&mut self.new_size.width)
                        .hint_text("Width (px)")
                        .desired_width(80.0),
                );
                ui.add(
                    egui::TextEdit::singleline(&mut self.new_size.height)
                        .hint_text("Height (px)")
                        .desired_width(80.0),
                );
                if ui.button("Add Size").clicked() {
                    self.add_custom_size();
                }
                if ui.button("Cancel").clicked() {
                    self.new_size = NewSizeForm::default();
                }
            });
            if let Some(err) = &self.new_size.error {
                ui.colored_label(egui::Color32::RED, err);
            }
        }

        if changed {
            self.on_sizes_changed();
        }
    }

    fn previews_panel(&mut self, ui: &mut egui::Ui) {
        let mut save_index = None;
        ui.horizontal(|ui| {
            ui.heading("Processed Images");
            if ui.button("💾 Save All").clicked() {
                save_index = Some(None);
            }
            if ui.button("📦 Download Zip").clicked() {
                self.download_zip();
            }
        });

        egui::ScrollArea::vertical().show(ui, |ui| {
            ui.horizontal_wrapped(|ui| {
                for (index, preview) in self.previews.iter().enumerate() {
                    ui.vertical(|ui| {
                        ui.add(egui::Image::new((
                            preview.texture.id(),
                            preview.texture.size_vec2(),
                        )));
                        ui.label(preview.result.size.as_string());
                        if ui.small_button("Save").clicked() {
                            save_index = Some(Some(index));
                        }
                    });
                }
            });
        });

        match save_index {
            Some(Some(index)) => self.save_one(index),
            Some(None) => self.save_everything(),
            None => {}
        }
    }
}

impl eframe::App for ResizerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_events(ctx);

        if self.processing {
            ctx.request_repaint();
        }

        egui::CentralPanel::default()
            .frame(egui::Frame {
                inner_margin: egui::Margin::symmetric(20.0, 20.0),
                fill: ctx.style().visuals.panel_fill,
                ..Default::default()
            })
            .show(ctx, |ui| {
                ui.add_enabled_ui(!self.processing, |ui| self.sizes_panel(ui));

                ui.separator();

                ui.horizontal(|ui| {
                    if ui
                        .add_enabled(!self.processing, egui::Button::new("📂 Select Image..."))
                        .clicked()
                    {
                        self.select_image();
                    }
                    match &self.source_path {
                        Some(path) => ui.label(path.display().to_string()),
                        None => ui.label("PNG, JPG/JPEG or GIF"),
                    }
                });

                ui.label(&self.status);
                if self.processing {
                    ui.add(
                        egui::ProgressBar::new(self.progress)
                            .text(format!("{:.0}%", self.progress * 100.0)),
                    );
                }
                if let Some(err) = &self.error {
                    ui.colored_label(egui::Color32::RED, err);
                }

                ui.horizontal(|ui| {
                    let open_enabled = self.output_dir.is_some();
                    if ui
                        .add_enabled(open_enabled, egui::Button::new("📂 Open Output Folder"))
                        .clicked()
                    {
                        if let Some(path) = &self.output_dir {
                            open_folder(path);
                        }
                    }
                });

                if !self.previews.is_empty() && !self.processing {
                    ui.separator();
                    self.previews_panel(ui);
                }
            });
    }
}

fn read_source(path: &std::path::Path, settings: &Settings) -> Result<Vec<u8>> {
    let size = fs::metadata(path)
        .with_context(|| format!("Cannot read {}", path.display()))?
        .len();
    if size > settings.max_input_bytes {
        return Err(anyhow!(
            "Image is {:.1}MB, the limit is {:.1}MB",
            size as f64 / (1024.0 * 1024.0),
            settings.max_input_bytes as f64 / (1024.0 * 1024.0)
        ));
    }
    fs::read(path).with_context(|| format!("Cannot read {}", path.display()))
}

fn parse_dimension(text: &str) -> Option<u32> {
    text.trim().parse::<u32>().ok()
}

fn run_worker(bytes: &[u8], sizes: &[SizePreset], settings: &Settings, sender: Sender<WorkerEvent>) {
    let outcome = process_image(bytes, sizes, settings, |done, total| {
        let _ = sender.send(WorkerEvent::Progress { done, total });
    })
    .map_err(anyhow::Error::from)
    .and_then(|results| {
        let previews = results
            .iter()
            .map(preview_image)
            .collect::<Result<Vec<_>>>()?;
        Ok((results, previews))
    });

    let event = match outcome {
        Ok((results, previews)) => WorkerEvent::Finished { results, previews },
        Err(e) => WorkerEvent::Failed(format!("{:#}", e)),
    };
    let _ = sender.send(event);
}

fn preview_image(result: &ProcessedImage) -> Result<egui::ColorImage> {
    let thumbnail = image::load_from_memory(&result.data)
        .with_context(|| format!("Cannot preview {}", result.file_name()))?
        .thumbnail(PREVIEW_SIDE, PREVIEW_SIDE)
        .to_rgba8();
    let size = [thumbnail.width() as usize, thumbnail.height() as usize];
    Ok(egui::ColorImage::from_rgba_unmultiplied(size, thumbnail.as_raw()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dimensions_parse_whole_numbers_only() {
        assert_eq!(parse_dimension(" 300 "), Some(300));
        assert_eq!(parse_dimension("12.5"), None);
        assert_eq!(parse_dimension(""), None);
        assert_eq!(parse_dimension("-4"), None);
    }

    #[test]
    fn oversized_file_is_rejected_before_reading() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.png");
        fs::write(&path, vec![0u8; 64]).unwrap();
        let settings = Settings {
            max_input_bytes: 32,
            ..Settings::default()
        };
        assert!(read_source(&path, &settings).is_err());

        let relaxed = Settings::default();
        assert_eq!(read_source(&path, &relaxed).unwrap().len(), 64);
    }

    #[test]
    fn worker_reports_progress_then_previews() {
        let source = image::DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
            40,
            30,
            image::Rgb([10, 120, 200]),
        ));
        let mut bytes = std::io::Cursor::new(Vec::new());
        source
            .write_to(&mut bytes, image::ImageOutputFormat::Png)
            .unwrap();

        let (sender, receiver) = std::sync::mpsc::channel();
        let sizes = crate::models::default_sizes();
        run_worker(bytes.get_ref(), &sizes, &Settings::default(), sender);

        let events: Vec<WorkerEvent> = receiver.try_iter().collect();
        assert_eq!(events.len(), sizes.len() + 1);
        match events.last() {
            Some(WorkerEvent::Finished { results, previews }) => {
                assert_eq!(results.len(), 4);
                assert_eq!(previews.len(), 4);
                // 728x90 thumbnails to 160 wide.
                assert_eq!(previews[1].size[0], 160);
            }
            _ => panic!("expected a finished event"),
        }
    }

    fn idle_app() -> ResizerApp {
        let dir = tempfile::tempdir().unwrap();
        ResizerApp::new(AppConfig::default(), dir.path().join("config.json"))
    }

    #[test]
    fn finished_worker_with_pending_event_is_not_a_failure() {
        let ctx = egui::Context::default();
        let mut app = idle_app();
        let (sender, receiver) = std::sync::mpsc::channel();
        app.progress_receiver = receiver;
        app.processing = true;

        let handle = thread::spawn(|| {});
        while !handle.is_finished() {
            thread::yield_now();
        }
        app.worker_thread = Some(handle);

        // Channel is still open but empty: nothing decided yet.
        app.drain_events(&ctx);
        assert!(app.processing);
        assert_eq!(app.error, None);
        assert!(app.worker_thread.is_none());

        sender
            .send(WorkerEvent::Finished {
                results: Vec::new(),
                previews: Vec::new(),
            })
            .unwrap();
        drop(sender);
        app.drain_events(&ctx);
        assert!(!app.processing);
        assert_eq!(app.error, None);
        assert!(app.status.starts_with("Done!"));
    }

    #[test]
    fn start_is_ignored_while_a_run_is_active() {
        let mut app = idle_app();
        app.source_bytes = Some(Arc::new(b"not read".to_vec()));
        app.processing = true;
        app.status = "Processing | 1 of 4 sizes".to_string();

        app.start_processing();
        assert!(app.worker_thread.is_none());
        assert_eq!(app.status, "Processing | 1 of 4 sizes");
    }

    #[test]
    fn silent_worker_exit_shows_generic_error() {
        let ctx = egui::Context::default();
        let mut app = idle_app();
        let (sender, receiver) = std::sync::mpsc::channel::<WorkerEvent>();
        app.progress_receiver = receiver;
        app.processing = true;
        drop(sender);

        app.drain_events(&ctx);
        assert!(!app.processing);
        assert_eq!(app.error.as_deref(), Some(PROCESS_FAILED));
    }

    #[test]
    fn success_clears_an_earlier_error() {
        let ctx = egui::Context::default();
        let mut app = idle_app();
        let (sender, receiver) = std::sync::mpsc::channel();
        app.progress_receiver = receiver;
        app.processing = true;
        app.error = Some(PROCESS_FAILED.to_string());

        sender
            .send(WorkerEvent::Finished {
                results: Vec::new(),
                previews: Vec::new(),
            })
            .unwrap();
        app.drain_events(&ctx);
        assert_eq!(app.error, None);
    }

    #[test]
    fn worker_reports_whole_image_failure() {
        let (sender, receiver) = std::sync::mpsc::channel();
        run_worker(b"nope", &crate::models::default_sizes(), &Settings::default(), sender);
        assert!(matches!(receiver.try_iter().last(), Some(WorkerEvent::Failed(_))));
    }
}
