//! Command-line driver: generates the synthetic blobs, evaluates both
//! objectives in pretrain and fine-tune mode on a batch, and reports
//! clustering accuracy and the cosine schedule.

mod scatter_viewer;

use crate::scatter_viewer::ScatterViewerApp;

use clap::Parser;
use eframe::egui;
use ndarray::{concatenate, Array1, Array2, ArrayView2, Axis};
use rand::rngs::StdRng;
use rand::SeedableRng;
use sparseclust::config::ExperimentConfig;
use sparseclust::data::{apply_mask, generate_seeded, ClusterDataset};
use sparseclust::losses::{
    argmax_rows, ClusterInputs, ClusterLoss, Loss, SparseInputs, SparseLoss,
};
use sparseclust::metrics::{clustering_accuracy, ClusteringAccuracy, Metric};
use sparseclust::serialization::save_dataset;
use std::path::PathBuf;
use std::sync::mpsc;
use std::thread;
use std::time::Instant;
use tracing::{error, info, Level};

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(author, version, about = "sparseclust: coding-rate losses for clustering with feature selection", long_about = None)]
struct Args {
    /// JSON experiment configuration; defaults are used when absent
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the synthetic-data seed
    #[arg(short, long)]
    seed: Option<u64>,

    /// Samples per evaluated batch
    #[arg(short, long, default_value_t = 256)]
    batch_size: usize,

    /// Save the generated dataset as SafeTensors
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Open the scatter-plot viewer
    #[arg(short, long)]
    visualize: bool,

    /// trace, debug, info, warn or error
    #[arg(long, default_value = "info")]
    log_level: Level,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_max_level(args.log_level)
        .with_target(false)
        .init();

    if args.visualize {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            if let Err(e) = run_computation(&args, Some(tx)) {
                error!(error = %e, "computation failed");
            }
        });
        let options = eframe::NativeOptions {
            viewport: egui::ViewportBuilder::default().with_inner_size([1280.0, 640.0]),
            ..Default::default()
        };
        eframe::run_native(
            "sparseclust - synthetic blobs",
            options,
            Box::new(|cc| Ok(Box::new(ScatterViewerApp::new(cc, rx)))),
        )?;
    } else {
        run_computation(&args, None)?;
    }
    Ok(())
}

fn run_computation(
    args: &Args,
    tx: Option<mpsc::Sender<ClusterDataset>>,
) -> Result<(), Box<dyn std::error::Error>> {
    let started = Instant::now();

    // ---------- 1. Configuration ----------
    let mut config = match &args.config {
        Some(path) => ExperimentConfig::from_json(path)?,
        None => ExperimentConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.synthetic.seed = seed;
    }
    if args.batch_size == 0 {
        return Err("batch size must be > 0".into());
    }
    config.validate()?;
    info!(version = sparseclust::VERSION, seed = config.synthetic.seed, "configuration ready");

    // ---------- 2. Data ----------
    let dataset = generate_seeded(&config.synthetic)?;
    info!(
        samples = dataset.num_samples(),
        features = dataset.num_features(),
        clusters = dataset.num_clusters(),
        "synthetic dataset generated"
    );
    if let Some(path) = &args.output {
        save_dataset(path, &dataset)?;
        info!(path = %path.display(), "dataset saved");
    }
    if let Some(tx) = &tx {
        // The viewer may already be closed.
        tx.send(dataset.clone()).ok();
    }

    let mut rng = StdRng::seed_from_u64(config.synthetic.seed.wrapping_add(1));
    let batches = dataset.batch_indices(args.batch_size, &mut rng);
    let Some(first) = batches.first() else {
        return Err("dataset is empty".into());
    };
    let batch = dataset.select(first)?;
    let x = batch.features().view();

    // ---------- 3. Mock network outputs ----------
    let informative = config.synthetic.informative_features();
    let mu: Array1<f32> = (0..dataset.num_features())
        .map(|j| if j < informative { 1.0 } else { -1.0 })
        .collect();
    let gates = mu.mapv(|m| (m + 0.5).clamp(0.0, 1.0));

    let x_hat = apply_mask(&x, config.mask.noise_kind(), &mut rng)?;
    let x_input_noised_hat = apply_mask(&x, config.mask.input_kind(), &mut rng)?;
    let x_latent_noised_hat = apply_mask(&x, config.mask.noise_kind(), &mut rng)?;
    let x_z_hat = &x * &gates;
    let yhat = soft_assignments(&x, &config.synthetic.centers);
    let yg = yhat.mapv(|p| p.max(1e-12).ln());

    // ---------- 4. Losses ----------
    let mut sparse = SparseLoss::from_config(&config.losses);
    let mut cluster = ClusterLoss::from_config(&config.losses);
    let mu_dyn = mu.view().into_dyn();

    for pretrain in [true, false] {
        if pretrain {
            sparse.pretrain();
            cluster.pretrain();
        } else {
            sparse.fine_tune();
            cluster.fine_tune();
        }
        let mode = if pretrain { "pretrain" } else { "fine-tune" };

        let inputs = SparseInputs::new(x.view(), x_hat.view(), x_input_noised_hat.view(), x_latent_noised_hat.view())
            .with_gates(x_z_hat.view(), x.view(), mu_dyn.view(), config.losses.lmbd);
        let parts = sparse.components(&inputs)?;
        info!(
            mode,
            input_reconstruction = parts.input_reconstruction,
            gate_reconstruction = parts.gate_reconstruction,
            input_denoising = parts.input_denoising,
            latent_denoising = parts.latent_denoising,
            gtcr_reg = parts.gtcr_reg,
            total = parts.total,
            "{}",
            sparse.name()
        );

        let inputs = ClusterInputs::new(x.view(), yhat.view(), config.losses.lmbd, config.losses.gamma)
            .with_gates(yg.view(), mu_dyn.view());
        let out = cluster.forward(inputs)?;
        info!(mode, cluster = out.cluster(), gate = ?out.gate(), "{}", cluster.name());
    }

    // ---------- 5. Clustering accuracy ----------
    let predicted = argmax_rows(&yhat.view());
    let batch_accuracy = clustering_accuracy(batch.labels().as_slice().unwrap_or(&[]), &predicted)?;
    info!(accuracy = batch_accuracy, "first batch clustering accuracy");

    let mut accuracy = ClusteringAccuracy::new();
    for indices in &batches {
        let part = dataset.select(indices)?;
        let predicted = argmax_rows(&soft_assignments(&part.features().view(), &config.synthetic.centers).view());
        accuracy.update(&predicted, &part.labels().to_vec());
    }
    info!(accuracy = accuracy.compute(), samples = accuracy.total(), "dataset clustering accuracy");

    // ---------- 6. Schedule ----------
    let schedule = config.schedule.schedule();
    let total = schedule.total_epochs();
    for epoch in [0, total / 4, total / 2, 3 * total / 4, total] {
        info!(epoch, value = schedule.value_at(epoch), "cosine schedule");
    }

    info!(elapsed = ?started.elapsed(), "done");
    Ok(())
}

/// Softmax over negative squared distances to the cluster centers,
/// computed on the leading informative columns of `x`.
fn soft_assignments(x: &ArrayView2<f32>, centers: &[Vec<f32>]) -> Array2<f32> {
    let rows: Vec<Array2<f32>> = x
        .axis_iter(Axis(0))
        .map(|sample| {
            let logits: Vec<f32> = centers
                .iter()
                .map(|center| {
                    -center
                        .iter()
                        .zip(sample.iter())
                        .map(|(c, v)| (v - c) * (v - c))
                        .sum::<f32>()
                })
                .collect();
            let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
            let exp: Vec<f32> = logits.iter().map(|l| (l - max).exp()).collect();
            let norm: f32 = exp.iter().sum();
            Array1::from_iter(exp.into_iter().map(|e| e / norm)).insert_axis(Axis(0))
        })
        .collect();
    let views: Vec<_> = rows.iter().map(|r| r.view()).collect();
    concatenate(Axis(0), &views).unwrap_or_else(|_| Array2::zeros((0, centers.len())))
}
