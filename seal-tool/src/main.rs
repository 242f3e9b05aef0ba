use anyhow::{ensure, Result};
use clap::Parser;
use futures::stream::StreamExt;
use log::info;
use prettytable::{cell, row, Table};
use rand::{prelude::*, rngs::StdRng};
use seal_dl::{
    config::Config, dataset::DetectionDataset, processor::NullEncoder, profiling,
    record::Category,
};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Parser)]
/// Inspect and derive seal detection datasets.
enum Opts {
    /// Print image and instance counts of a dataset file.
    Info {
        /// dataset file
        dataset_file: PathBuf,
    },
    /// Write a copy of a dataset with perturbed boxes.
    Noise {
        /// dataset file
        dataset_file: PathBuf,
        /// output dataset file
        output_file: PathBuf,
        /// standard deviation of the train box noise, relative to box size
        #[clap(long, default_value = "0.0")]
        noise: f64,
        /// centre offset applied to every box, relative to box size
        #[clap(long, default_value = "0.0")]
        offset: f64,
        /// random seed
        #[clap(long)]
        seed: Option<u64>,
    },
    /// Run the training loader and print the shape of its batches.
    Preview {
        /// configuration file
        config_file: PathBuf,
        /// dataset file
        dataset_file: PathBuf,
        /// number of batches to load
        #[clap(long, default_value = "1")]
        num_batches: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    pretty_env_logger::init();

    match Opts::parse() {
        Opts::Info { dataset_file } => info(dataset_file)?,
        Opts::Noise {
            dataset_file,
            output_file,
            noise,
            offset,
            seed,
        } => add_noise(dataset_file, output_file, noise, offset, seed)?,
        Opts::Preview {
            config_file,
            dataset_file,
            num_batches,
        } => preview(config_file, dataset_file, num_batches).await?,
    }

    Ok(())
}

fn info(dataset_file: impl AsRef<Path>) -> Result<()> {
    let dataset = DetectionDataset::load(dataset_file)?;
    let counts = dataset.count_categories();

    let mut table = Table::new();
    table.add_row(row!["category", "images", "instances"]);

    Category::ALL.iter().for_each(|&category| {
        let num_instances: usize = dataset
            .get_images(Some(category))
            .iter()
            .map(|record| record.target.len())
            .sum();
        table.add_row(row![
            category,
            counts.get(&category).copied().unwrap_or(0),
            num_instances
        ]);
    });
    table.printstd();

    println!("classes: {}", dataset.classes().join(", "));
    Ok(())
}

fn add_noise(
    dataset_file: impl AsRef<Path>,
    output_file: impl AsRef<Path>,
    noise: f64,
    offset: f64,
    seed: Option<u64>,
) -> Result<()> {
    let dataset = DetectionDataset::load(dataset_file)?;
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let (noisy, report) = dataset.add_noise(noise, offset, &mut rng)?;
    noisy.save(&output_file)?;

    match report.mean_iou() {
        Some(mean_iou) => println!(
            "{} train instances, mean iou {:.4}",
            report.num_instances, mean_iou
        ),
        None => println!("no train instances"),
    }
    Ok(())
}

async fn preview(
    config_file: impl AsRef<Path>,
    dataset_file: impl AsRef<Path>,
    num_batches: usize,
) -> Result<()> {
    let config = Config::open(config_file)?;
    let dataset = DetectionDataset::load(dataset_file)?;
    let loader = dataset.train(&config, &NullEncoder)?;
    ensure!(!loader.is_empty(), "the dataset has no train images");
    info!("{} batches per epoch", loader.len());

    let mut stream = loader.stream().take(num_batches);
    let mut index = 0;
    while let Some(batch) = stream.next().await {
        let batch = batch?;
        println!(
            "batch {}: image {:?}, {} instances, ids {:?}",
            index,
            batch.image.size(),
            batch.target.label.size()[0],
            batch.id
        );
        index += 1;
    }

    profiling::report_stage_stats();
    Ok(())
}
