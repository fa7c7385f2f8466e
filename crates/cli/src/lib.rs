mod check;
mod classes;
mod names;
mod show;

use clap::{Args, Parser, Subcommand};
use classtags_core::TagQuery;
use classtags_core::fragment::FileFragment;
use classtags_java::ClasspathLocator;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

#[derive(Parser)]
#[command(
    name = "classtags",
    version,
    about = "Inspect class tag indexes on a Java classpath",
    long_about = "Every build output directory or jar may carry a tag index at \
                  META-INF/classtags.idx. classtags merges the indexes visible on a classpath \
                  and answers which classes carry which tags."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Also log to stderr
    #[arg(long, global = true)]
    pub log_stderr: bool,
}

/// Where fragments are looked up.
#[derive(Args, Debug, Default, Clone)]
pub struct ClasspathArgs {
    /// Classpath root or path-separated list of roots (repeatable)
    #[arg(long, short = 'c', value_name = "CLASSPATH")]
    pub classpath: Vec<String>,

    /// Directory whose jars are all added to the classpath (repeatable)
    #[arg(long, value_name = "DIR")]
    pub jar_dir: Vec<PathBuf>,

    /// Extra index file outside the classpath (repeatable)
    #[arg(long, value_name = "FILE")]
    pub fragment: Vec<PathBuf>,
}

impl ClasspathArgs {
    pub fn locator(&self) -> ClasspathLocator {
        let mut locator = ClasspathLocator::new();
        for entry in &self.classpath {
            for root in ClasspathLocator::from_classpath_str(entry).roots() {
                locator = locator.with_root(root.clone());
            }
        }
        for dir in &self.jar_dir {
            locator = locator.with_jar_dir(dir);
        }
        debug!("Classpath has {} roots", locator.roots().len());
        locator
    }

    pub fn query(&self) -> TagQuery {
        self.fragment.iter().fold(
            TagQuery::with_locator(Arc::new(self.locator())),
            |query, path| query.fragment(FileFragment::shared(path)),
        )
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// List entities carrying a tag
    Names {
        #[command(flatten)]
        source: ClasspathArgs,

        /// Tag name, e.g. com.example.Plugin
        #[arg(long, short = 't')]
        tag: String,
    },
    /// Show every tagged entity with its tags
    Show {
        #[command(flatten)]
        source: ClasspathArgs,

        /// Only entities carrying this tag
        #[arg(long, short = 't')]
        tag: Option<String>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Resolve tagged entities to class files
    Classes {
        #[command(flatten)]
        source: ClasspathArgs,

        /// Only entities carrying this tag
        #[arg(long, short = 't')]
        tag: Option<String>,

        /// Leave out interfaces and abstract classes
        #[arg(long)]
        concrete: bool,

        /// Report entities that could not be resolved
        #[arg(long, short = 'v')]
        verbose: bool,
    },
    /// Decode one index file and report what it contains
    Check {
        #[arg(value_name = "FILE")]
        path: PathBuf,
    },
}

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let _guard = classtags_core::logging::init_logging("cli", cli.log_stderr);

    match cli.command {
        Commands::Names { source, tag } => names::run(&source, &tag),
        Commands::Show { source, tag, json } => show::run(&source, tag.as_deref(), json),
        Commands::Classes {
            source,
            tag,
            concrete,
            verbose,
        } => classes::run(&source, tag.as_deref(), concrete, verbose),
        Commands::Check { path } => check::run(&path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_repeated_classpath() {
        let cli = Cli::try_parse_from([
            "classtags",
            "names",
            "--tag",
            "t.T",
            "--classpath",
            "a",
            "-c",
            "b.jar",
            "--fragment",
            "extra.idx",
        ])
        .unwrap();
        let Commands::Names { source, tag } = cli.command else {
            panic!("expected names");
        };
        assert_eq!(tag, "t.T");
        assert_eq!(source.classpath, vec!["a", "b.jar"]);
        assert_eq!(source.fragment, vec![PathBuf::from("extra.idx")]);
        assert_eq!(source.locator().roots().len(), 2);
    }
}
