//! Interactive browse loop: one line per command, the table is redrawn after each.

use std::str::FromStr;

use usertable_core::{FilterPatch, RecordId, SortField};

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Filter(FilterPatch),
    ClearFilters,
    Sort(SortField),
    Page(usize),
    Next,
    Prev,
    First,
    Last,
    Show(RecordId),
    Close,
    Retry,
    Help,
    Quit,
}

pub const HELP: &str = "\
commands:
  search <text>     filter by name, email or phone (empty clears)
  gender <g>        male | female | other (empty clears)
  min <n>, max <n>  age bounds, inclusive (empty clears)
  clear             drop all filters
  sort <field>      click a header: firstName lastName maidenName age gender phone
  page <n>, next, prev, first, last
  show <id>, close  open or close the detail view
  retry             reload the collection
  quit";

pub fn parse(line: &str) -> Result<Command, String> {
    let line = line.trim();
    let (verb, arg) = match line.split_once(char::is_whitespace) {
        Some((v, a)) => (v, a.trim()),
        None => (line, ""),
    };
    let cmd = match verb.to_ascii_lowercase().as_str() {
        "search" | "s" | "/" => Command::Filter(FilterPatch::new().search(arg)),
        "gender" | "g" => Command::Filter(FilterPatch::new().gender_input(arg)),
        "min" | "age-min" => Command::Filter(FilterPatch::new().age_min_input(arg)),
        "max" | "age-max" => Command::Filter(FilterPatch::new().age_max_input(arg)),
        "clear" => Command::ClearFilters,
        "sort" | "o" => Command::Sort(SortField::from_str(arg).map_err(|e| e.to_string())?),
        "page" => Command::Page(arg.parse().map_err(|_| format!("invalid page: {arg:?}"))?),
        "next" | "n" => Command::Next,
        "prev" | "p" => Command::Prev,
        "first" => Command::First,
        "last" => Command::Last,
        "show" => Command::Show(arg.parse().map_err(|_| format!("invalid id: {arg:?}"))?),
        "close" => Command::Close,
        "retry" | "reload" => Command::Retry,
        "help" | "?" | "" => Command::Help,
        "quit" | "q" | "exit" => Command::Quit,
        other => return Err(format!("unknown command: {other} (try `help`)")),
    };
    Ok(cmd)
}

#[cfg(test)]
mod tests {
    use super::*;
    use usertable_core::{Gender, Patch};

    #[test]
    fn filter_commands_build_patches() {
        assert_eq!(parse("search  Anna ").unwrap(), Command::Filter(FilterPatch::new().search("Anna")));
        assert_eq!(parse("search").unwrap(), Command::Filter(FilterPatch::new().clear_search()));
        assert_eq!(parse("g Female").unwrap(), Command::Filter(FilterPatch::new().gender(Gender::Female)));
        match parse("min abc").unwrap() {
            Command::Filter(p) => assert_eq!(p.age_min, Patch::Clear),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(parse("max 40").unwrap(), Command::Filter(FilterPatch::new().age_max(40)));
    }

    #[test]
    fn navigation_and_detail() {
        assert_eq!(parse("sort maiden-name").unwrap(), Command::Sort(SortField::MaidenName));
        assert_eq!(parse("page 3").unwrap(), Command::Page(3));
        assert_eq!(parse("N").unwrap(), Command::Next);
        assert_eq!(parse("show 12").unwrap(), Command::Show(12));
        assert_eq!(parse("").unwrap(), Command::Help);
    }

    #[test]
    fn bad_input_is_reported() {
        assert!(parse("page x").is_err());
        assert!(parse("sort email").is_err());
        assert!(parse("dance").is_err());
    }
}
