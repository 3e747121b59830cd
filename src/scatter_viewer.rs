//! Native scatter-plot viewer for clustering datasets, built on egui.

use eframe::egui;
use sparseclust::data::ClusterDataset;
use std::sync::mpsc::Receiver;

const POINT_RADIUS: f32 = 2.0;
const MARGIN: f32 = 24.0;

const PALETTE: [egui::Color32; 8] = [
    egui::Color32::from_rgb(31, 119, 180),
    egui::Color32::from_rgb(255, 127, 14),
    egui::Color32::from_rgb(44, 160, 44),
    egui::Color32::from_rgb(214, 39, 40),
    egui::Color32::from_rgb(148, 103, 189),
    egui::Color32::from_rgb(140, 86, 75),
    egui::Color32::from_rgb(227, 119, 194),
    egui::Color32::from_rgb(127, 127, 127),
];

/// One 2-D projection of the dataset, ready to draw.
struct Projection {
    title: String,
    points: Vec<[f64; 2]>,
    bounds: ([f64; 2], [f64; 2]),
}

impl Projection {
    fn new(dataset: &ClusterDataset, a: usize, b: usize) -> Option<Self> {
        let points = dataset.projection(a, b).ok()?;
        let mut min = [f64::INFINITY; 2];
        let mut max = [f64::NEG_INFINITY; 2];
        for p in &points {
            for k in 0..2 {
                min[k] = min[k].min(p[k]);
                max[k] = max[k].max(p[k]);
            }
        }
        Some(Self {
            title: format!("X{} vs X{}", a + 1, b + 1),
            points,
            bounds: (min, max),
        })
    }

    fn to_screen(&self, p: [f64; 2], rect: egui::Rect) -> egui::Pos2 {
        let (min, max) = self.bounds;
        let span = |k: usize| (max[k] - min[k]).max(1e-9);
        let tx = ((p[0] - min[0]) / span(0)) as f32;
        let ty = ((p[1] - min[1]) / span(1)) as f32;
        egui::pos2(
            rect.left() + tx * rect.width(),
            rect.bottom() - ty * rect.height(),
        )
    }

    fn draw(&self, ui: &mut egui::Ui, labels: &[usize]) {
        ui.heading(&self.title);
        let (response, painter) = ui.allocate_painter(ui.available_size(), egui::Sense::hover());
        let plot = response.rect.shrink(MARGIN);
        painter.rect_stroke(plot, 0.0, egui::Stroke::new(1.0, egui::Color32::GRAY));

        for (p, &label) in self.points.iter().zip(labels) {
            let color = PALETTE[label % PALETTE.len()];
            painter.circle_filled(self.to_screen(*p, plot), POINT_RADIUS, color);
        }

        let (min, max) = self.bounds;
        let font = egui::FontId::monospace(11.0);
        painter.text(
            plot.left_bottom() + egui::vec2(0.0, 4.0),
            egui::Align2::LEFT_TOP,
            format!("{:.1}", min[0]),
            font.clone(),
            egui::Color32::LIGHT_GRAY,
        );
        painter.text(
            plot.right_bottom() + egui::vec2(0.0, 4.0),
            egui::Align2::RIGHT_TOP,
            format!("{:.1}", max[0]),
            font.clone(),
            egui::Color32::LIGHT_GRAY,
        );
        painter.text(
            plot.left_top() - egui::vec2(4.0, 0.0),
            egui::Align2::RIGHT_TOP,
            format!("{:.1}", max[1]),
            font,
            egui::Color32::LIGHT_GRAY,
        );
    }
}

/// Shows the (X1, X2) and (X1, X3) projections side by side, colored by label.
pub struct ScatterViewerApp {
    rx: Receiver<ClusterDataset>,
    labels: Vec<usize>,
    projections: Vec<Projection>,
}

impl ScatterViewerApp {
    pub fn new(cc: &eframe::CreationContext<'_>, rx: Receiver<ClusterDataset>) -> Self {
        cc.egui_ctx.set_visuals(egui::Visuals::dark());
        Self {
            rx,
            labels: Vec::new(),
            projections: Vec::new(),
        }
    }

    fn load(&mut self, dataset: &ClusterDataset) {
        self.labels = dataset.labels().to_vec();
        self.projections = [(0, 1), (0, 2)]
            .into_iter()
            .filter_map(|(a, b)| Projection::new(dataset, a, b))
            .collect();
    }
}

impl eframe::App for ScatterViewerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if let Ok(dataset) = self.rx.try_recv() {
            self.load(&dataset);
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            if self.projections.is_empty() {
                ui.centered_and_justified(|ui| ui.label("Waiting for data..."));
                return;
            }
            let labels = &self.labels;
            let projections = &self.projections;
            ui.columns(projections.len(), |columns| {
                for (column, projection) in columns.iter_mut().zip(projections) {
                    projection.draw(column, labels);
                }
            });
        });

        ctx.request_repaint_after(std::time::Duration::from_millis(200));
    }
}
