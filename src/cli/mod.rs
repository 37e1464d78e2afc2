use clap::{App, Arg, ArgMatches};
use log::Level;
use std::path::PathBuf;

pub struct Args {
    pub input: PathBuf,
    pub output: Option<PathBuf>,
    /// Also write a Blender-compatible document when one is needed.
    pub compat_output: bool,
    pub ignore_empty: bool,
    pub log_level: Level,
}

pub fn version() -> String {
    format!("{} ({} {})",
        env!("CARGO_PKG_VERSION"),
        include_str!(concat!(env!("OUT_DIR"), "/git-commit")),
        include_str!(concat!(env!("OUT_DIR"), "/compile-date")),
    )
}

fn app<'a>(version: &'a str) -> App<'a, 'a> {
    App::new("skin2dae")
        .version(version)
        .about("Converts a skinned scene to COLLADA (.dae)")
        .arg(Arg::with_name("INPUT")
            .required(true)
            .help("Scene description (.json)"))
        .arg(Arg::with_name("OUTPUT")
            .help("Output file [default: <INPUT name>.dae in the current directory]"))
        .arg(Arg::with_name("blender")
            .short("b")
            .long("blender-output")
            .help("Also write <OUTPUT>_blender.dae, rearranged for Blender, if the scene needs it"))
        .arg(Arg::with_name("ignore_empty")
            .short("i")
            .long("ignore-empty")
            .help("Leave out nodes with no meshes, no children and no bone"))
        .arg(Arg::with_name("verbose")
            .short("v")
            .long("verbose")
            .conflicts_with("quiet")
            .help("Print more about what's going on"))
        .arg(Arg::with_name("quiet")
            .short("q")
            .long("quiet")
            .help("Only print warnings and errors"))
}

pub fn parse_cli_args() -> Args {
    let version = version();
    let matches = app(&version).get_matches();
    args_from_matches(&matches)
}

fn args_from_matches(matches: &ArgMatches) -> Args {
    let log_level =
        if matches.is_present("verbose") {
            Level::Debug
        } else if matches.is_present("quiet") {
            Level::Warn
        } else {
            Level::Info
        };

    Args {
        // clap has already checked INPUT is there
        input: matches.value_of_os("INPUT").map(PathBuf::from).unwrap_or_default(),
        output: matches.value_of_os("OUTPUT").map(PathBuf::from),
        compat_output: matches.is_present("blender"),
        ignore_empty: matches.is_present("ignore_empty"),
        log_level,
    }
}

pub fn print_usage() {
    let version = version();
    let _ = app(&version).print_help();
    println!();
}

#[test]
fn test_args() {
    let version = version();
    let matches = app(&version)
        .get_matches_from(vec!["skin2dae", "-b", "--ignore-empty", "-v", "hero.json"]);
    let args = args_from_matches(&matches);
    assert_eq!(args.input, PathBuf::from("hero.json"));
    assert_eq!(args.output, None);
    assert!(args.compat_output);
    assert!(args.ignore_empty);
    assert_eq!(args.log_level, Level::Debug);

    let matches = app(&version)
        .get_matches_from(vec!["skin2dae", "hero.json", "out/hero.dae", "-q"]);
    let args = args_from_matches(&matches);
    assert_eq!(args.output, Some(PathBuf::from("out/hero.dae")));
    assert!(!args.compat_output);
    assert_eq!(args.log_level, Level::Warn);
}

#[test]
fn test_missing_input() {
    let version = version();
    assert!(app(&version).get_matches_from_safe(vec!["skin2dae"]).is_err());
}
