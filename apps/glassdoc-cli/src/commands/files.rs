use super::payload;
use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use glassdoc_sdk::api::{DocumentKind, UploadOptions};
use glassdoc_sdk::types::{DocumentGenerationRequest, OutputFormat, UploadFile};
use glassdoc_sdk::{Gateway, ProgressCallback};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args)]
pub struct UploadArgs {
    /// File to upload
    path: PathBuf,
    /// e.g. company, document, temp
    #[arg(long)]
    category: Option<String>,
    /// e.g. marks, picture, signature
    #[arg(long)]
    subcategory: Option<String>,
    #[arg(long)]
    description: Option<String>,
    /// Repeat for several tags
    #[arg(long = "tag")]
    tags: Vec<String>,
}

impl UploadArgs {
    pub async fn run(self, gateway: &Gateway) -> Result<()> {
        let file = UploadFile::from_path(&self.path)
            .await
            .with_context(|| format!("cannot read {}", self.path.display()))?;
        let options = UploadOptions {
            category: self.category,
            subcategory: self.subcategory,
            description: self.description,
            tags: self.tags,
        };

        let result = gateway
            .uploads()
            .upload(file, options, Some(stderr_progress()))
            .await;
        eprintln!();
        let uploaded = payload(result?)?;

        println!("{}", uploaded.filename);
        println!("url:  {}", uploaded.url);
        println!("size: {} bytes ({})", uploaded.size, uploaded.mime_type);
        Ok(())
    }
}

/// Progress line redrawn in place on stderr
fn stderr_progress() -> ProgressCallback {
    Arc::new(|pct| {
        let mut err = std::io::stderr().lock();
        if write!(err, "\ruploading {pct:>3}%").and_then(|()| err.flush()).is_err() {
            tracing::debug!("progress output failed");
        }
    })
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Docx,
    Pdf,
    Xlsx,
}

impl From<FormatArg> for OutputFormat {
    fn from(value: FormatArg) -> Self {
        match value {
            FormatArg::Docx => Self::Docx,
            FormatArg::Pdf => Self::Pdf,
            FormatArg::Xlsx => Self::Xlsx,
        }
    }
}

#[derive(Args)]
pub struct GenerateArgs {
    /// if, cert, other, tr, tm, review-control-sheet or all
    kind: DocumentKind,
    session_id: String,
    #[arg(long, value_enum)]
    format: Option<FormatArg>,
    /// Template to render instead of the default one
    #[arg(long)]
    template: Option<String>,
}

impl GenerateArgs {
    pub async fn run(self, gateway: &Gateway) -> Result<()> {
        let request = DocumentGenerationRequest {
            output_format: self.format.map(OutputFormat::from),
            template_name: self.template,
            ..DocumentGenerationRequest::new(self.session_id)
        };
        let generated = payload(gateway.mvp().generate(self.kind, &request).await?)?;

        println!("{}", generated.filename);
        println!("download: {}", generated.download_url);
        if generated.file_size > 0 {
            println!("size:     {} bytes", generated.file_size);
        }
        Ok(())
    }
}

#[derive(Args)]
pub struct DownloadArgs {
    /// Name of a generated document
    filename: String,
    /// Where to write it
    output: PathBuf,
}

impl DownloadArgs {
    pub async fn run(self, gateway: &Gateway) -> Result<()> {
        let download = gateway.mvp().download_document(&self.filename).await?;
        tokio::fs::write(&self.output, &download.bytes)
            .await
            .with_context(|| format!("cannot write {}", self.output.display()))?;
        println!(
            "{} bytes written to {}",
            download.bytes.len(),
            self.output.display()
        );
        Ok(())
    }
}
