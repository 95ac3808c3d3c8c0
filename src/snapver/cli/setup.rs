use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "snapver", bin_name = "snapver", version)]
#[command(
    about = "Browse, compare and annotate versioned backup copies of text files",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Backup directory (default: configured backup-dir, else the current directory)
    #[arg(short, long, global = true, help_heading = "Options")]
    pub dir: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true, help_heading = "Options")]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the versions of a document, newest first, reconciling their tags
    #[command(alias = "ls")]
    Scan {
        /// Base name, document or backup file name
        file: String,
    },

    /// Show the tag of a version, or set it when a value is given
    Tag {
        file: String,

        /// Version (V3, v3 or 3)
        version: String,

        /// New tag; words are joined with spaces. Pass "" to clear.
        value: Vec<String>,
    },

    /// Show the tag history of a version
    History { file: String, version: String },

    /// Re-read and reconcile tags across all versions
    Refresh { file: String },

    /// Print the backup path of one or more versions
    Path {
        file: String,

        #[arg(required = true)]
        versions: Vec<String>,
    },

    /// List working documents with their backup counts
    Masters,

    /// Get or set configuration
    Config {
        /// Configuration key (backup-dir, production-dir, backup-ext,
        /// attribute-backend, attribute-namespace)
        key: Option<String>,

        /// Value to set
        value: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("snapver").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn ls_is_scan() {
        let cli = parse(&["ls", "doc"]);
        assert!(matches!(cli.command, Commands::Scan { ref file } if file == "doc"));
    }

    #[test]
    fn tag_value_words_are_collected() {
        let cli = parse(&["tag", "doc", "V2", "sent", "to", "review"]);
        match cli.command {
            Commands::Tag {
                file,
                version,
                value,
            } => {
                assert_eq!(file, "doc");
                assert_eq!(version, "V2");
                assert_eq!(value.join(" "), "sent to review");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = parse(&["history", "doc", "1", "--dir", "/srv/b", "-v"]);
        assert_eq!(cli.dir, Some(PathBuf::from("/srv/b")));
        assert!(cli.verbose);
    }

    #[test]
    fn path_needs_a_version() {
        assert!(Cli::try_parse_from(["snapver", "path", "doc"]).is_err());
    }
}
