use clap::Parser;

/// This is a live election swing projection program.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path) The results of the election being counted, as a JSON snapshot.
    /// For more information about the file format, read the documentation of the live_swing::manual module.
    #[clap(long, value_parser)]
    pub current: String,

    /// (file path) The complete results of the previous election, as a JSON snapshot.
    #[clap(short, long, value_parser)]
    pub previous: String,

    /// (file path) The project configuration in JSON format: party codes, preference flows and seat overrides.
    #[clap(short, long, value_parser)]
    pub config: String,

    /// (file path, 'stdout' or empty) If specified, the projection will be written in JSON format to the given
    /// location. By default, it is printed on the standard output.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path) If specified, the seat by seat, booth by booth diagnostic report is written to this file.
    #[clap(short, long, value_parser)]
    pub diagnostics: Option<String>,

    /// (file path) A reference file containing a projection in JSON format. If provided, liveswing will
    /// check that the computed projection matches the reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
