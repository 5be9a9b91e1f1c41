use std::{
    path::{Path, PathBuf},
    process::ExitCode,
};

use bill_tdm::{
    config::{MalformedPolicy, StopWordSource},
    vectorizer::serde::{load_labels, load_matrix, load_vocabulary},
    ArtifactPaths, Pipeline, PipelineConfig, Result,
};
use clap::{Args, Parser, Subcommand};
use sprs::CsMat;
use tracing::error;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "bill-tdm", version, about = "Build a bigram term-document matrix from bill texts")]
struct Cli {
    /// more log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run both passes and write every artifact
    Build(BuildArgs),
    /// Reload the artifacts of a previous run and print a summary
    Inspect {
        /// directory a `build` wrote into
        out_dir: PathBuf,
        /// labels to show
        #[arg(long, default_value_t = 5)]
        head: usize,
    },
}

#[derive(Debug, Args)]
struct BuildArgs {
    /// corpus file, one `<bill_id> <field> <text...>` per line
    input: PathBuf,
    #[arg(short, long)]
    out_dir: PathBuf,
    /// TOML config; flags below override it
    #[arg(short, long)]
    config: Option<PathBuf>,
    #[arg(long)]
    ngram: Option<usize>,
    #[arg(long)]
    no_below: Option<u64>,
    #[arg(long)]
    no_above: Option<f64>,
    #[arg(long)]
    keep_n: Option<usize>,
    /// raw counts instead of TF-IDF weights
    #[arg(long)]
    no_tfidf: bool,
    #[arg(long)]
    no_lemmatize: bool,
    /// `english`, `none`, or a stopword file
    #[arg(long)]
    stopwords: Option<String>,
    /// `surface<TAB>lemma` lexicon
    #[arg(long)]
    lemma_table: Option<PathBuf>,
    /// warn and skip malformed corpus lines instead of failing
    #[arg(long)]
    skip_malformed: bool,
    #[arg(long)]
    quiet: bool,
}

impl BuildArgs {
    fn to_config(&self) -> Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_toml_file(path)?,
            None => PipelineConfig::default(),
        };
        if let Some(n) = self.ngram {
            config.tokenizer.ngram = n;
        }
        if let Some(no_below) = self.no_below {
            config.prune.no_below = no_below;
        }
        if let Some(no_above) = self.no_above {
            config.prune.no_above = no_above;
        }
        if self.keep_n.is_some() {
            config.prune.keep_n = self.keep_n;
        }
        if self.no_tfidf {
            config.weighting.tfidf = false;
        }
        if self.no_lemmatize {
            config.tokenizer.lemmatize = false;
        }
        if let Some(s) = &self.stopwords {
            config.tokenizer.stopwords = s.parse::<StopWordSource>()?;
        }
        if self.lemma_table.is_some() {
            config.tokenizer.lemma_table = self.lemma_table.clone();
        }
        if self.skip_malformed {
            config.on_malformed = MalformedPolicy::Skip;
        }
        if self.quiet {
            config.status = false;
        }
        config.validate()?;
        Ok(config)
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn build(args: &BuildArgs) -> Result<()> {
    let pipeline = Pipeline::new(args.to_config()?)?;
    let report = pipeline.run(&args.input, &args.out_dir)?;
    println!("tdm dimensions: {:?}", report.shape);
    println!(
        "documents: {} (skipped lines: {}), vocabulary: {} -> {}, nnz: {}",
        report.documents, report.skipped_lines, report.prune.before, report.prune.after, report.nnz
    );
    Ok(())
}

fn inspect(out_dir: &Path, head: usize) -> Result<()> {
    let paths = ArtifactPaths::in_dir(out_dir);
    let vocabulary = load_vocabulary(&paths.vocabulary)?;
    let labels = load_labels(&paths.labels)?;
    let matrix: CsMat<f64> = load_matrix(&paths.matrix)?;
    println!("tdm dimensions: {:?}", matrix.shape());
    println!(
        "vocabulary: {} terms over {} documents, labels: {}",
        vocabulary.len(),
        vocabulary.num_docs(),
        labels.len()
    );
    for (col, label) in labels.iter().take(head).enumerate() {
        let nnz = matrix.outer_view(col).map_or(0, |c| c.nnz());
        println!("{col}\t{label}\t{nnz} terms");
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match &cli.command {
        Command::Build(args) => build(args),
        Command::Inspect { out_dir, head } => inspect(out_dir, *head),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            let mut source = std::error::Error::source(&e);
            while let Some(cause) = source {
                error!("caused by: {cause}");
                source = cause.source();
            }
            ExitCode::FAILURE
        }
    }
}
