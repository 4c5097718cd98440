//! Commands that read and change the open database.
//!
//! Every name, key and value typed on the command line goes through
//! [`string_to_bytes`] before it reaches the store, and everything printed
//! goes through [`bytes_to_string`]. Each invocation runs in exactly one
//! read-only or read-write scope.

use std::rc::Rc;

use super::{Command, CommandError};
use crate::codec::{bytes_to_string, string_to_bytes};
use crate::context::Context;
use crate::matcher::Matcher;
use crate::pager::Pager;
use crate::store::{ReadScope, Store};
use crate::table::Table;
use crate::validate::{ValidationError, Validates};

const WITH_VALUE: &str = "withvalue";

/// Most path segments `get` accepts.
const MAX_GET_ARGS: usize = 1024;

type Handler = fn(&dyn Store, &mut Context<'_>, &[String]) -> Result<(), CommandError>;

/// The data commands, in help-listing order.
pub fn commands(store: Rc<dyn Store>) -> Vec<Command> {
    vec![
        bind(
            &store,
            &["stat", "st"],
            "Print database basic information",
            Validates::new().num_args(0),
            stat,
        ),
        bind(
            &store,
            &["get", "g"],
            "Get key-value pairs",
            Validates::new().min_args(2).max_args(MAX_GET_ARGS),
            get,
        )
        .with_usage("get <bucket-name> [nest-bucket-name...] <key>"),
        bind(
            &store,
            &["buckets", "b"],
            "List all buckets",
            Validates::new().max_args(1),
            list_buckets,
        )
        .with_usage("buckets [pattern]"),
        bind(
            &store,
            &["keys", "k"],
            "List a bucket all keys",
            Validates::new()
                .min_args(1)
                .max_args(3)
                .append(check_keys_options),
            list_keys,
        )
        .with_usage("keys <bucket-name> [pattern] [withvalue] (with two options, one must be withvalue)"),
        bind(
            &store,
            &["remove", "rm"],
            "Remove bucket or keys",
            Validates::new().min_args(2).choices(0, &["bucket", "key"]),
            remove,
        )
        .with_usage("remove bucket|key [bucket-name] [key]"),
        bind(
            &store,
            &["copy-bucket", "cpbkt"],
            "Copy bucket to another bucket",
            Validates::new().num_args(2),
            copy_bucket,
        )
        .with_usage("copy-bucket <dst> <src>"),
        bind(
            &store,
            &["set", "s"],
            "Set key-value pairs",
            Validates::new().num_args(3),
            set,
        )
        .with_usage("set <bucket> <key> <value>"),
        bind(
            &store,
            &["merge-all-buckets-into-one"],
            "Merges all buckets data into one bucket, keep only one bucket when this command success.",
            Validates::new().num_args(1),
            merge_all_buckets_into_one,
        )
        .with_usage("merge-all-buckets-into-one <bucket-name>"),
    ]
}

fn bind(
    store: &Rc<dyn Store>,
    aliases: &[&'static str],
    help: &'static str,
    validates: Validates,
    handler: Handler,
) -> Command {
    let store = Rc::clone(store);
    Command::new(aliases, help, validates, move |ctx, args| {
        handler(&*store, ctx, args)
    })
}

/// Path of a top-level bucket typed on the command line.
fn top(name: &str) -> [Vec<u8>; 1] {
    [string_to_bytes(name)]
}

fn stat(store: &dyn Store, ctx: &mut Context<'_>, _args: &[String]) -> Result<(), CommandError> {
    let (keys, buckets, max_depth) = store.view(|tx| -> Result<_, CommandError> {
        let mut keys = 0;
        let mut buckets = 0;
        let mut max_depth = 0;
        for name in tx.buckets(&[])? {
            let s = tx.stats(&[name])?;
            keys += s.key_n;
            buckets += 1;
            max_depth = max_depth.max(s.depth);
        }
        Ok((keys, buckets, max_depth))
    })?;

    let mut table = Table::new(&["keys", "bucket", "max-depth"]);
    table.rows.push(vec![
        keys.to_string(),
        buckets.to_string(),
        max_depth.to_string(),
    ]);
    ctx.println(table.render())?;
    Ok(())
}

fn get(store: &dyn Store, ctx: &mut Context<'_>, args: &[String]) -> Result<(), CommandError> {
    let (key, names) = match args.split_last() {
        Some(split) => split,
        None => return Ok(()),
    };
    let path: Vec<Vec<u8>> = names.iter().map(|n| string_to_bytes(n)).collect();

    store.view(|tx| -> Result<(), CommandError> {
        if !tx.has_bucket(&path[..1])? {
            ctx.print_info("err: bucket not found")?;
            return Ok(());
        }
        for depth in 2..=path.len() {
            if !tx.has_bucket(&path[..depth])? {
                ctx.print_info(format!("err: bucket {} not found", names[depth - 1]))?;
                return Ok(());
            }
        }
        match tx.get(&path, &string_to_bytes(key))? {
            Some(value) => ctx.println(bytes_to_string(&value))?,
            None => ctx.print_info("err: key-value not found")?,
        }
        Ok(())
    })
}

fn list_buckets(
    store: &dyn Store,
    ctx: &mut Context<'_>,
    args: &[String],
) -> Result<(), CommandError> {
    let matcher = Matcher::new(args.first().map(String::as_str).unwrap_or(""))?;
    let pager = Pager::new(&["bucket", "keys", "depth"], ctx.page_size());

    store.view(|tx| -> Result<(), CommandError> {
        let names = tx.buckets(&[])?;
        let rows = names
            .into_iter()
            .filter(|name| matcher.is_match(name))
            .map(|name| bucket_row(tx, name));
        pager.print_all(ctx, rows)?;
        Ok(())
    })
}

fn bucket_row(tx: &dyn ReadScope, name: Vec<u8>) -> Result<Vec<String>, CommandError> {
    let label = bytes_to_string(&name);
    let s = tx.stats(&[name])?;
    Ok(vec![label, s.key_n.to_string(), s.depth.to_string()])
}

/// Options after the bucket name of `keys`.
#[derive(Debug, Default, PartialEq, Eq)]
struct KeysOptions<'a> {
    pattern: &'a str,
    with_value: bool,
}

impl<'a> KeysOptions<'a> {
    /// `extra` is whatever follows the bucket name, in either order.
    fn parse(extra: &'a [String]) -> Result<Self, ValidationError> {
        match extra {
            [] => Ok(Self::default()),
            [flag] if flag == WITH_VALUE => Ok(Self {
                pattern: "",
                with_value: true,
            }),
            [pattern] => Ok(Self {
                pattern: pattern.as_str(),
                with_value: false,
            }),
            [flag, pattern] | [pattern, flag] if flag == WITH_VALUE => Ok(Self {
                pattern: pattern.as_str(),
                with_value: true,
            }),
            _ => Err(ValidationError::Other(format!(
                "with a pattern, the other option must be '{}'",
                WITH_VALUE
            ))),
        }
    }
}

fn check_keys_options(args: &[String]) -> Result<(), ValidationError> {
    KeysOptions::parse(args.get(1..).unwrap_or_default()).map(|_| ())
}

fn list_keys(store: &dyn Store, ctx: &mut Context<'_>, args: &[String]) -> Result<(), CommandError> {
    let options = KeysOptions::parse(&args[1..])?;
    let matcher = Matcher::new(options.pattern)?;
    let pager = if options.with_value {
        Pager::new(&["key", "value"], ctx.page_size())
    } else {
        Pager::new(&["key"], ctx.page_size())
    };
    let bucket = top(&args[0]);

    store.view(|tx| -> Result<(), CommandError> {
        if !tx.has_bucket(&bucket)? {
            ctx.print_info("err: bucket not found")?;
            return Ok(());
        }
        let rows = tx.entries(&bucket)?.filter_map(|entry| match entry {
            Ok((key, _)) if !matcher.is_match(&key) => None,
            Ok((key, value)) => {
                let mut row = vec![bytes_to_string(&key)];
                if options.with_value {
                    row.push(bytes_to_string(&value));
                }
                Some(Ok(row))
            }
            Err(e) => Some(Err(CommandError::from(e))),
        });
        pager.print_all(ctx, rows)?;
        Ok(())
    })
}

fn remove(store: &dyn Store, _ctx: &mut Context<'_>, args: &[String]) -> Result<(), CommandError> {
    if args[0] == "key" {
        if args.len() < 3 {
            return Err(CommandError::Usage(
                "remove a key must provide bucket and key".to_string(),
            ));
        }
        let bucket = top(&args[1]);
        return store.update(|tx| -> Result<(), CommandError> {
            if !tx.has_bucket(&bucket)? {
                return Ok(());
            }
            for key in &args[2..] {
                tx.delete(&bucket, &string_to_bytes(key))?;
            }
            Ok(())
        });
    }

    store.update(|tx| -> Result<(), CommandError> {
        for name in &args[1..] {
            tx.delete_bucket(&top(name))?;
        }
        Ok(())
    })
}

fn copy_bucket(
    store: &dyn Store,
    _ctx: &mut Context<'_>,
    args: &[String],
) -> Result<(), CommandError> {
    let dst = top(&args[0]);
    let src = top(&args[1]);

    store.update(|tx| -> Result<(), CommandError> {
        if !tx.has_bucket(&src)? {
            return Ok(());
        }
        tx.copy_bucket(&src, &dst)?;
        Ok(())
    })
}

fn set(store: &dyn Store, _ctx: &mut Context<'_>, args: &[String]) -> Result<(), CommandError> {
    let bucket = top(&args[0]);
    let key = string_to_bytes(&args[1]);
    let value = string_to_bytes(&args[2]);

    store.update(|tx| -> Result<(), CommandError> {
        tx.create_bucket_if_not_exists(&bucket)?;
        tx.put(&bucket, &key, &value)?;
        Ok(())
    })
}

fn merge_all_buckets_into_one(
    store: &dyn Store,
    _ctx: &mut Context<'_>,
    args: &[String],
) -> Result<(), CommandError> {
    let dest = top(&args[0]);

    store.update(|tx| -> Result<(), CommandError> {
        tx.create_bucket_if_not_exists(&dest)?;
        for name in tx.buckets(&[])? {
            if name == dest[0] {
                continue;
            }
            let source = [name];
            tx.copy_bucket(&source, &dest)?;
            tx.delete_bucket(&source)?;
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::Registry;
    use crate::config::SessionConfig;
    use crate::io::{OutputStyle, TestHost};
    use crate::store::{RedbStore, StoreError};

    type Shared = Rc<dyn Store>;

    fn run(db: &Shared, lines: &[&str]) -> TestHost {
        run_with_answers(db, lines, &[])
    }

    fn run_with_answers(db: &Shared, lines: &[&str], answers: &[&str]) -> TestHost {
        let registry = Registry::with_store(Rc::clone(db)).unwrap();
        let mut host = TestHost::new();
        for a in answers {
            host.queue_answer(*a);
        }
        {
            let mut ctx = Context::new(&mut host, &SessionConfig::default());
            for line in lines {
                registry.execute(&mut ctx, line).unwrap();
            }
        }
        host
    }

    fn memory_db() -> Shared {
        Rc::new(RedbStore::in_memory().unwrap())
    }

    fn path(names: &[&str]) -> Vec<Vec<u8>> {
        names.iter().map(|n| n.as_bytes().to_vec()).collect()
    }

    fn bucket_names(db: &Shared) -> Vec<Vec<u8>> {
        db.view(|tx| -> Result<_, StoreError> { tx.buckets(&[]) })
            .unwrap()
    }

    fn value(db: &Shared, bucket: &[u8], key: &[u8]) -> Option<Vec<u8>> {
        let bucket = [bucket.to_vec()];
        db.view(|tx| -> Result<_, StoreError> {
            if !tx.has_bucket(&bucket)? {
                return Ok(None);
            }
            tx.get(&bucket, key)
        })
        .unwrap()
    }

    #[test]
    fn set_then_get() {
        let db = memory_db();
        let host = run(&db, &["set mybucket k1 v1", "get mybucket k1"]);
        assert_eq!(host.output_text(), "v1");
        assert!(host.errors().is_empty());
    }

    #[test]
    fn get_missing_is_reported_not_failed() {
        let db = memory_db();
        let host = run(
            &db,
            &[
                "set mybucket k1 v1",
                "get mybucket missing",
                "get nobucket k1",
                "get mybucket inner k1",
            ],
        );
        assert_eq!(
            host.output_with_style(OutputStyle::Info),
            vec![
                "err: key-value not found",
                "err: bucket not found",
                "err: bucket inner not found",
            ]
        );
        assert!(host.errors().is_empty());
    }

    #[test]
    fn get_walks_nested_buckets() {
        let db = memory_db();
        db.update(|tx| -> Result<(), StoreError> {
            tx.create_bucket_if_not_exists(&path(&["outer"]))?;
            tx.create_bucket_if_not_exists(&path(&["outer", "inner"]))?;
            tx.put(&path(&["outer", "inner"]), b"k", b"deep")
        })
        .unwrap();

        let host = run(&db, &["get outer inner k"]);
        assert_eq!(host.output_text(), "deep");
    }

    #[test]
    fn binary_values_round_trip_through_the_command_line() {
        let db = memory_db();
        let host = run(&db, &[r"set b k\x00 line\x0aend\xff", r"get b k\x00"]);
        assert_eq!(value(&db, b"b", b"k\x00").unwrap(), b"line\nend\xff");
        assert_eq!(host.output_text(), r"line\x0aend\xff");
    }

    #[test]
    fn keys_with_value() {
        let db = memory_db();
        let host = run(&db, &["set mybucket k1 v1", "keys mybucket withvalue"]);
        let text = host.output_text();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "id  key  value");
        assert_eq!(lines[2], "1   k1   v1");
    }

    #[test]
    fn keys_pattern_and_flag_in_either_order() {
        let db = memory_db();
        let setup = ["set b apple 1", "set b avocado 2", "set b banana 3"];

        let mut lines = setup.to_vec();
        lines.push("keys b ^a");
        let host = run(&db, &lines);
        let text = host.output_text();
        assert!(text.contains("apple") && text.contains("avocado"));
        assert!(!text.contains("banana"));
        assert!(!text.contains("value"));

        for line in ["keys b withvalue ^b", "keys b ^b withvalue"] {
            let host = run(&db, &[line]);
            let text = host.output_text();
            assert!(text.contains("banana"), "{}", line);
            assert!(text.contains("value"), "{}", line);
            assert!(!text.contains("apple"), "{}", line);
        }
    }

    #[test]
    fn keys_rejects_two_patterns() {
        let db = memory_db();
        let host = run(&db, &["set b k v", "keys b ^a ^b"]);
        assert_eq!(host.errors().len(), 1);
        assert!(host.errors()[0].starts_with("error: "));
        assert!(host.output_with_style(OutputStyle::Normal).is_empty());
    }

    #[test]
    fn keys_unknown_bucket() {
        let db = memory_db();
        let host = run(&db, &["keys nothing"]);
        assert_eq!(host.output_text(), "err: bucket not found");
    }

    #[test]
    fn keys_skips_nested_buckets() {
        let db = memory_db();
        db.update(|tx| -> Result<(), StoreError> {
            tx.create_bucket_if_not_exists(&path(&["b"]))?;
            tx.put(&path(&["b"]), b"plain", b"1")?;
            tx.create_bucket_if_not_exists(&path(&["b", "child"]))
        })
        .unwrap();

        let host = run(&db, &["keys b"]);
        let text = host.output_text();
        assert!(text.contains("plain"));
        assert!(!text.contains("child"));
    }

    #[test]
    fn bad_pattern_fails_before_output() {
        let db = memory_db();
        let host = run(&db, &["set b k v", "buckets (", "keys b ["]);
        assert_eq!(
            host.errors(),
            vec!["error: bad pattern syntax", "error: bad pattern syntax"]
        );
        assert!(host.output_with_style(OutputStyle::Normal).is_empty());
    }

    #[test]
    fn buckets_lists_and_filters() {
        let db = memory_db();
        let host = run(
            &db,
            &["set users a 1", "set users b 2", "set orders x 1", "buckets", "buckets ^u"],
        );
        let pages = host.output_with_style(OutputStyle::Normal);
        assert_eq!(pages.len(), 2);

        let all: Vec<&str> = pages[0].lines().collect();
        assert_eq!(all[0], "id  bucket  keys  depth");
        assert_eq!(all[2], "1   orders  1     1");
        assert_eq!(all[3], "2   users   2     1");

        let filtered: Vec<&str> = pages[1].lines().collect();
        assert_eq!(filtered.len(), 3);
        assert!(filtered[2].contains("users"));
    }

    #[test]
    fn buckets_on_empty_database_prints_nothing() {
        let db = memory_db();
        let host = run(&db, &["buckets"]);
        assert!(host.output().is_empty());
    }

    #[test]
    fn long_listing_pages_and_stops_on_no() {
        let db = memory_db();
        db.update(|tx| -> Result<(), StoreError> {
            tx.create_bucket_if_not_exists(&path(&["big"]))?;
            for i in 0..65 {
                tx.put(&path(&["big"]), format!("key-{:03}", i).as_bytes(), b"v")?;
            }
            Ok(())
        })
        .unwrap();

        let host = run_with_answers(&db, &["keys big"], &["n"]);
        assert_eq!(host.questions(), &["continue [Y/n]?".to_string()]);
        let pages = host.output_with_style(OutputStyle::Normal);
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].lines().count(), 32 + 2);
    }

    #[test]
    fn stat_summarizes() {
        let db = memory_db();
        let host = run(&db, &["set a x 1", "set b y 2", "stat"]);
        assert_eq!(
            host.output_text(),
            "keys  bucket  max-depth\n----  ------  ---------\n2     2       1"
        );
    }

    #[test]
    fn remove_bucket_then_list() {
        let db = memory_db();
        let host = run(&db, &["set mybucket k1 v1", "remove bucket mybucket", "buckets"]);
        assert!(host.output().is_empty());
        assert!(bucket_names(&db).is_empty());
    }

    #[test]
    fn remove_missing_bucket_aborts_whole_command() {
        let db = memory_db();
        let host = run(&db, &["set a k v", "rm bucket a nothing"]);
        assert_eq!(host.errors(), vec!["error: bucket not found"]);
        assert_eq!(bucket_names(&db), vec![b"a".to_vec()]);
    }

    #[test]
    fn remove_keys() {
        let db = memory_db();
        let host = run(
            &db,
            &["set b k1 v1", "set b k2 v2", "set b k3 v3", "rm key b k1 k3", "rm key nothing k1"],
        );
        assert!(host.errors().is_empty());
        assert_eq!(value(&db, b"b", b"k1"), None);
        assert_eq!(value(&db, b"b", b"k2"), Some(b"v2".to_vec()));
        assert_eq!(value(&db, b"b", b"k3"), None);
    }

    #[test]
    fn remove_validation() {
        let db = memory_db();
        let host = run(&db, &["remove file x", "remove key b", "remove"]);
        assert_eq!(
            host.errors(),
            vec![
                "error: argument 1 should be one of [bucket, key]",
                "error: remove a key must provide bucket and key",
                "error: expect minimum 2 arguments, got 0",
            ]
        );
    }

    #[test]
    fn copy_bucket_copies_into_destination() {
        let db = memory_db();
        let host = run(
            &db,
            &["set src a 1", "set src b 2", "set dst c 3", "copy-bucket dst src", "cpbkt x nothing"],
        );
        assert!(host.errors().is_empty());
        assert_eq!(value(&db, b"dst", b"a"), Some(b"1".to_vec()));
        assert_eq!(value(&db, b"dst", b"b"), Some(b"2".to_vec()));
        assert_eq!(value(&db, b"dst", b"c"), Some(b"3".to_vec()));
        assert_eq!(value(&db, b"src", b"a"), Some(b"1".to_vec()));
        assert_eq!(bucket_names(&db), vec![b"dst".to_vec(), b"src".to_vec()]);
    }

    #[test]
    fn merge_all_buckets_into_one() {
        let db = memory_db();
        let host = run(&db, &["set A x 1", "set B y 2", "merge-all-buckets-into-one dest"]);
        assert!(host.errors().is_empty());
        assert_eq!(bucket_names(&db), vec![b"dest".to_vec()]);
        assert_eq!(value(&db, b"dest", b"x"), Some(b"1".to_vec()));
        assert_eq!(value(&db, b"dest", b"y"), Some(b"2".to_vec()));
    }

    #[test]
    fn merge_into_existing_bucket_keeps_it() {
        let db = memory_db();
        run(&db, &["set A x 1", "set B y 2", "merge-all-buckets-into-one B"]);
        assert_eq!(bucket_names(&db), vec![b"B".to_vec()]);
        assert_eq!(value(&db, b"B", b"x"), Some(b"1".to_vec()));
        assert_eq!(value(&db, b"B", b"y"), Some(b"2".to_vec()));
    }

    #[test]
    fn failed_update_leaves_no_partial_change() {
        let db = memory_db();
        db.update(|tx| -> Result<(), StoreError> {
            tx.create_bucket_if_not_exists(&path(&["b"]))?;
            tx.create_bucket_if_not_exists(&path(&["b", "nested"]))
        })
        .unwrap();

        // "nested" is a bucket, so deleting it as a key fails after "k" is gone.
        let host = run(&db, &["set b k v", "rm key b k nested"]);
        assert_eq!(host.errors(), vec!["error: incompatible value"]);
        assert_eq!(value(&db, b"b", b"k"), Some(b"v".to_vec()));
    }

    #[test]
    fn changes_persist_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.db");

        let db: Shared = Rc::new(RedbStore::create(&path).unwrap());
        run(&db, &["set mybucket k1 v1"]);
        drop(db);

        let db: Shared = Rc::new(RedbStore::open(&path).unwrap());
        let host = run(&db, &["get mybucket k1"]);
        assert_eq!(host.output_text(), "v1");
    }

    #[test]
    fn help_shows_usage() {
        let db = memory_db();
        let host = run(&db, &["help get"]);
        assert_eq!(
            host.output_text(),
            "Get key-value pairs.\nUsage: get <bucket-name> [nest-bucket-name...] <key>"
        );
    }

    #[test]
    fn keys_help_explains_two_options() {
        let db = memory_db();
        let host = run(&db, &["help keys"]);
        assert_eq!(
            host.output_text(),
            "List a bucket all keys.\nUsage: keys <bucket-name> [pattern] [withvalue] \
             (with two options, one must be withvalue)"
        );
    }

    #[test]
    fn copy_bucket_brings_nested_buckets() {
        let db = memory_db();
        db.update(|tx| -> Result<(), StoreError> {
            tx.create_bucket_if_not_exists(&path(&["src"]))?;
            tx.create_bucket_if_not_exists(&path(&["src", "inner"]))?;
            tx.put(&path(&["src", "inner"]), b"k", b"deep")
        })
        .unwrap();

        let host = run(&db, &["cpbkt dst src", "get dst inner k"]);
        assert!(host.errors().is_empty());
        assert_eq!(host.output_text(), "deep");
    }

    #[test]
    fn keys_options_parse() {
        let args = |v: &[&str]| v.iter().map(|s| s.to_string()).collect::<Vec<_>>();

        assert_eq!(KeysOptions::parse(&args(&[])).unwrap(), KeysOptions::default());
        assert_eq!(
            KeysOptions::parse(&args(&["withvalue"])).unwrap(),
            KeysOptions {
                pattern: "",
                with_value: true
            }
        );
        assert_eq!(
            KeysOptions::parse(&args(&["^a"])).unwrap(),
            KeysOptions {
                pattern: "^a",
                with_value: false
            }
        );
        assert!(KeysOptions::parse(&args(&["^a", "^b"])).is_err());
    }
}
