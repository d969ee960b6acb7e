use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use f90asr::asr::{verify, AsrDump};
use f90asr::ast::TranslationUnit;
use f90asr::modfile::NoModules;
use f90asr::{ast_to_asr, SemaSettings};

/// Recorded result of analyzing one case. `lints` and `dump` are compared
/// only once they have been recorded, so hand-written entries may give just
/// the outcome.
#[derive(Serialize, Deserialize, Default, Debug, Clone, PartialEq)]
struct Expectation {
    outcome: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    lints: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    dump: Option<String>,
}

impl Expectation {
    fn normalize(&self) -> Self {
        let mut norm = self.clone();
        if let Some(dump) = &mut norm.dump {
            *dump = dump.replace("\r\n", "\n");
            while dump.ends_with('\n') {
                dump.pop();
            }
        }
        norm
    }
}

#[derive(Serialize, Deserialize, Default, Debug)]
struct AllExpectations {
    cases: HashMap<String, Expectation>,
}

fn analyze_case(src: &Path) -> Expectation {
    let json = fs::read_to_string(src).expect("failed to read case file");
    let unit: TranslationUnit = serde_json::from_str(&json)
        .unwrap_or_else(|e| panic!("{} is not a valid syntax tree: {}", src.display(), e));

    let mut loader = NoModules;
    match ast_to_asr(&unit, &mut loader, &SemaSettings::default()) {
        Err(e) => Expectation {
            outcome: format!("error: {:?}: {}", e.kind, e.message),
            lints: None,
            dump: None,
        },
        Ok(analysis) => {
            let outcome = match verify::verify(&analysis.asr) {
                Ok(()) => "ok".to_string(),
                Err(problems) => format!("inconsistent: {}", problems.join("; ")),
            };
            Expectation {
                outcome,
                lints: Some(
                    analysis
                        .lints
                        .iter()
                        .map(|l| format!("{}: {}", l.name, l.message))
                        .collect(),
                ),
                dump: Some(AsrDump(&analysis.asr).to_string()),
            }
        }
    }
}

fn expectations_path() -> PathBuf {
    PathBuf::from("tests/expectations.json")
}

fn load_all() -> AllExpectations {
    if let Ok(d) = fs::read_to_string(expectations_path()) {
        serde_json::from_str(&d).unwrap_or_default()
    } else {
        AllExpectations::default()
    }
}

fn save_all(all: &AllExpectations) {
    let mut items: Vec<_> = all.cases.iter().collect();
    items.sort_by_key(|(k, _)| k.get(0..2).and_then(|p| p.parse::<u8>().ok()).unwrap_or(0));

    let mut ordered = serde_json::Map::new();
    for (k, v) in items {
        ordered.insert(k.clone(), serde_json::to_value(v).unwrap());
    }

    let data = serde_json::to_string_pretty(&serde_json::json!({ "cases": ordered })).unwrap();
    fs::write(expectations_path(), data + "\n").unwrap();
}

fn list_test_files() -> Vec<PathBuf> {
    let mut files: Vec<_> = fs::read_dir("tests/cases")
        .unwrap()
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| {
            p.extension()
                .map(|e| e.eq_ignore_ascii_case("json"))
                .unwrap_or(false)
        })
        .filter(|p| {
            // include only files with stem like "01_name" .. "99_name"
            if let Some(stem_os) = p.file_stem() {
                let s = stem_os.to_string_lossy();
                if s.len() < 3 || s.as_bytes().get(2) != Some(&b'_') {
                    return false;
                }
                if let Ok(n) = s[0..2].parse::<u8>() {
                    return (1..=99).contains(&n);
                }
            }
            false
        })
        .collect();
    files.sort();
    files
}

fn process_case(
    stem: &str,
    got: Expectation,
    all: &mut AllExpectations,
    record: bool,
    changed: &mut bool,
    failures: &mut Vec<String>,
) {
    if record || !all.cases.contains_key(stem) {
        all.cases.insert(stem.to_string(), got);
        println!("[recorded] {}", stem);
        *changed = true;
        return;
    }

    let recorded = all.cases.get_mut(stem).unwrap();
    let exp = recorded.normalize();
    let got = got.normalize();
    let mut ok = true;

    if exp.outcome != got.outcome {
        println!("---- {} ----", stem);
        println!("outcome expected\n  {}\ngot\n  {}", exp.outcome, got.outcome);
        ok = false;
    }
    match (&exp.lints, &got.lints) {
        (Some(e), Some(g)) if e != g => {
            println!("---- {} ----", stem);
            println!("lints expected {:?} got {:?}", e, g);
            ok = false;
        }
        (None, Some(_)) if ok => {
            recorded.lints = got.lints.clone();
            *changed = true;
        }
        _ => {}
    }
    match (&exp.dump, &got.dump) {
        (Some(e), Some(g)) if e != g => {
            println!("---- {} ----", stem);
            println!("ASR dump diff\nEXPECTED:\n{}\nGOT:\n{}", e, g);
            ok = false;
        }
        (None, Some(_)) if ok => {
            recorded.dump = got.dump.clone();
            *changed = true;
        }
        _ => {}
    }

    if ok {
        println!("[ok] {}", stem);
    } else {
        failures.push(stem.to_string());
    }
}

#[test]
fn analyze_cases() {
    let mut record = false;
    for a in std::env::args().skip(1) {
        if a == "--record" {
            record = true;
        }
    }
    if std::env::var("TESTSUITE_RECORD") == Ok("1".into()) {
        record = true;
    }

    let mut all = load_all();
    let mut changed = false;
    let mut failures = Vec::new();

    for path in list_test_files() {
        let stem = path.file_stem().unwrap().to_string_lossy().to_string();
        let got = analyze_case(&path);
        process_case(&stem, got, &mut all, record, &mut changed, &mut failures);
    }

    if changed && failures.is_empty() {
        save_all(&all);
    }

    assert!(failures.is_empty(), "test failures: {:?}", failures);
}
