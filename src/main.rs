extern crate log;
extern crate pretty_env_logger;

use std::path::PathBuf;
use std::process::exit;

use clap::{arg, command, value_parser, ArgMatches, Command};
use log::error;

use omr_scorer::store::load_answer_key_file;
use omr_scorer::{
    score_sheet_files, AnswerKey, AnswerKeyStore, DirectoryKeyStore, MarkingScheme, OptionCount,
    PreprocessOptions, ScoringOptions, SheetResult,
};

fn main() {
    pretty_env_logger::init_custom_env("LOG");

    let matches = cli().get_matches();

    if matches.get_flag("list-keys") {
        list_keys(&matches);
        return;
    }

    let key = load_key(&matches);

    let correct = *matches
        .get_one::<f64>("correct")
        .expect("correct marks have a default");
    let incorrect = *matches
        .get_one::<f64>("incorrect")
        .expect("incorrect marks have a default");
    let marking = match MarkingScheme::new(correct, incorrect) {
        Ok(marking) => marking,
        Err(e) => {
            eprintln!("Error: {}", e);
            exit(1);
        }
    };

    let options_per_question = matches
        .get_one::<u8>("options")
        .copied()
        .and_then(OptionCount::new)
        .unwrap_or_default();

    let options = ScoringOptions {
        options_per_question,
        marking,
        preprocess: PreprocessOptions {
            blur_before_threshold: matches.get_flag("blur"),
        },
        annotate_dir: matches.get_one::<PathBuf>("annotate-dir").cloned(),
        debug: matches.get_flag("debug"),
    };

    if let Some(annotate_dir) = &options.annotate_dir {
        if let Err(e) = std::fs::create_dir_all(annotate_dir) {
            eprintln!("Error creating {}: {}", annotate_dir.display(), e);
            exit(1);
        }
    }

    let sheets = matches
        .get_many::<PathBuf>("sheets")
        .map(|paths| paths.cloned().collect::<Vec<PathBuf>>())
        .unwrap_or_default();

    let results = score_sheet_files(&sheets, &key, &options);
    let scored = results
        .into_iter()
        .filter_map(|(path, result)| match result {
            Ok(result) => Some(result),
            Err(e) => {
                error!("{}: {}", path.display(), e);
                None
            }
        })
        .collect::<Vec<SheetResult>>();

    match serde_json::to_string_pretty(&scored) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Error serializing results: {}", e);
            exit(1);
        }
    }

    if scored.is_empty() && !sheets.is_empty() {
        exit(1);
    }
}

fn open_store(matches: &ArgMatches) -> DirectoryKeyStore {
    let keys_dir = match matches.get_one::<PathBuf>("keys-dir") {
        Some(keys_dir) => keys_dir,
        None => {
            eprintln!("Error: --keys-dir is required");
            exit(1);
        }
    };
    match DirectoryKeyStore::open(keys_dir) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("Error opening answer key directory: {}", e);
            exit(1);
        }
    }
}

fn list_keys(matches: &ArgMatches) {
    match open_store(matches).list() {
        Ok(names) => {
            for name in names {
                println!("{}", name);
            }
        }
        Err(e) => {
            eprintln!("Error listing answer keys: {}", e);
            exit(1);
        }
    }
}

fn load_key(matches: &ArgMatches) -> AnswerKey {
    let result = match (
        matches.get_one::<PathBuf>("key"),
        matches.get_one::<String>("key-name"),
    ) {
        (Some(path), _) => load_answer_key_file(path),
        (None, Some(name)) => open_store(matches).load(name),
        (None, None) => {
            eprintln!("Error: pass --key <PATH> or --keys-dir <DIR> --key-name <NAME>");
            exit(1);
        }
    };

    match result {
        Ok(key) if key.question_count() == 0 => {
            eprintln!("Error: the answer key has no questions");
            exit(1);
        }
        Ok(key) => key,
        Err(e) => {
            eprintln!("Error loading answer key: {}", e);
            exit(1);
        }
    }
}

#[allow(clippy::cognitive_complexity)]
fn cli() -> Command {
    command!()
        .arg(
            arg!(-k --key <PATH> "Path to an answer key JSON file")
                .value_parser(value_parser!(PathBuf))
                .required(false),
        )
        .arg(
            arg!(--"keys-dir" <DIR> "Directory of stored answer keys")
                .value_parser(value_parser!(PathBuf))
                .required(false),
        )
        .arg(arg!(--"key-name" <NAME> "Name of a stored answer key, e.g. setA.json").required(false))
        .arg(arg!(--"list-keys" "List the stored answer keys and exit"))
        .arg(
            arg!(-c --correct <MARKS> "Marks for a correct answer")
                .value_parser(value_parser!(f64))
                .default_value("1")
                .required(false),
        )
        .arg(
            arg!(-i --incorrect <MARKS> "Marks for an incorrect answer (zero or negative)")
                .value_parser(value_parser!(f64))
                .allow_negative_numbers(true)
                .default_value("0")
                .required(false),
        )
        .arg(
            arg!(-o --options <N> "Answer options per question")
                .value_parser(value_parser!(u8).range(1..=26))
                .default_value("4")
                .required(false),
        )
        .arg(
            arg!(-a --"annotate-dir" <DIR> "Write annotated sheets to this directory")
                .value_parser(value_parser!(PathBuf))
                .required(false),
        )
        .arg(arg!(--blur "Blur the sheet before thresholding"))
        .arg(arg!(-d --debug "Write debug images next to each sheet"))
        .arg(
            arg!(sheets: <SHEET> ... "Sheet images to score")
                .value_parser(value_parser!(PathBuf))
                .required(false)
                .required_unless_present("list-keys"),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_is_well_formed() {
        cli().debug_assert();
    }

    #[test]
    fn test_cli_parses_negative_marks() {
        let matches = cli()
            .try_get_matches_from(["omr-scorer", "-k", "key.json", "-i", "-0.25", "a.png", "b.png"])
            .unwrap();
        assert_eq!(matches.get_one::<f64>("incorrect"), Some(&-0.25));
        assert_eq!(matches.get_one::<u8>("options"), Some(&4));
        assert_eq!(matches.get_many::<PathBuf>("sheets").unwrap().count(), 2);
    }

    #[test]
    fn test_cli_rejects_bad_option_count() {
        assert!(cli()
            .try_get_matches_from(["omr-scorer", "-k", "key.json", "-o", "0", "a.png"])
            .is_err());
    }

    #[test]
    fn test_cli_list_keys_needs_no_sheets() {
        let matches = cli()
            .try_get_matches_from(["omr-scorer", "--keys-dir", "keys", "--list-keys"])
            .unwrap();
        assert!(matches.get_flag("list-keys"));
    }
}
