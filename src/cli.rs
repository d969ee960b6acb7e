use std::path::PathBuf;
use structopt::StructOpt;

use f90asr::config::OverloadPolicy;

#[derive(Debug, StructOpt, Clone)]
#[structopt(
    name = "f90asr",
    about = "Semantic analysis of Fortran 90 syntax trees into a typed ASR"
)]
pub struct Cli {
    /// Enable all warnings
    #[structopt(long = "Wall", help = "Enable all warnings")]
    pub wall: bool,
    /// Treat warnings as errors
    #[structopt(long = "Werror", help = "Treat warnings as errors")]
    pub werror: bool,

    /// Directories searched for `<module>.mod` files
    #[structopt(short = "I", long = "include", value_name = "DIR", parse(from_os_str))]
    pub module_paths: Vec<PathBuf>,

    #[structopt(
        long = "overload-policy",
        value_name = "POLICY",
        default_value = "first-match",
        help = "How generic calls pick a specific procedure: first-match or unique"
    )]
    pub overload_policy: OverloadPolicy,

    #[structopt(long = "no-lower", help = "Keep array intrinsic calls instead of generating helpers")]
    pub no_lower: bool,

    #[structopt(
        long = "implicit-typing",
        help = "Use the default i-n implicit typing in units without IMPLICIT statements"
    )]
    pub implicit_typing: bool,

    /// Fortran source the tree was parsed from; enables `!#allow(...)`
    /// directives and source snippets in diagnostics
    #[structopt(long, value_name = "FILE", parse(from_os_str))]
    pub source: Option<PathBuf>,

    #[structopt(
        long = "quiet",
        short = "q",
        help = "Suppress all output except errors"
    )]
    pub quiet: bool,

    #[structopt(subcommand)]
    pub cmd: Command,
}

#[derive(Debug, StructOpt, Clone)]
pub enum Command {
    /// Run semantic checks only
    Check {
        /// Syntax tree as JSON
        #[structopt(parse(from_os_str))]
        input: PathBuf,
    },
    /// Print the ASR of a translation unit
    Asr {
        /// Syntax tree as JSON
        #[structopt(parse(from_os_str))]
        input: PathBuf,
        /// Check the ASR invariants before printing
        #[structopt(long)]
        verify: bool,
    },
    /// Write a `.mod` file for every module of a translation unit
    EmitMod {
        /// Syntax tree as JSON
        #[structopt(parse(from_os_str))]
        input: PathBuf,
        /// Output directory
        #[structopt(short = "o", long, default_value = ".", parse(from_os_str))]
        out: PathBuf,
    },
}
