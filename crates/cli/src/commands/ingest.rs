//! `ikms ingest`: index one PDF and report the result.

use std::path::PathBuf;

use ikms_retrieval::VectorIndex;

pub async fn run(file: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let (config, provider) = super::load_provider()?;
    let index = VectorIndex::from_config(provider, &config.retrieval);

    let chunks = index.index_pdf(&file).await?;
    println!("Indexed {} into {chunks} chunks", file.display());

    Ok(())
}
