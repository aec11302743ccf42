#![allow(dead_code)]

use spicetify_wizard::error::InvokeError;
use spicetify_wizard::invoker::{RawOutput, ToolRunner};
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};

/// Keys the real tool treats as append/remove lists on `config key value`.
const DELTA_KEYS: &[&str] = &["extensions", "custom_apps"];

/// In-memory stand-in for the spicetify CLI and its config-xpui.ini.
#[derive(Default)]
pub struct FakeSpicetify {
    pub store: RefCell<BTreeMap<String, String>>,
    /// Every call with the fixed flags stripped.
    pub calls: RefCell<Vec<Vec<String>>>,
    /// Canned replies for non-config subcommands, keyed by the joined args.
    pub replies: HashMap<String, RawOutput>,
    pub missing: bool,
}

impl FakeSpicetify {
    pub fn with(pairs: &[(&str, &str)]) -> Self {
        let fake = Self::default();
        for (k, v) in pairs {
            fake.store.borrow_mut().insert(k.to_string(), v.to_string());
        }
        fake
    }

    pub fn reply(mut self, args: &str, code: i32, stdout: &str) -> Self {
        let reply = RawOutput {
            code: Some(code),
            stdout: stdout.into(),
            stderr: String::new(),
        };
        self.replies.insert(args.to_string(), reply);
        self
    }

    pub fn value(&self, key: &str) -> String {
        self.store.borrow().get(key).cloned().unwrap_or_default()
    }

    /// Values passed to `config <key> <value>` calls, in order.
    pub fn writes(&self, key: &str) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .filter(|c| c.len() == 3 && c[0] == "config" && c[1] == key)
            .map(|c| c[2].clone())
            .collect()
    }

    pub fn ran(&self, args: &str) -> bool {
        self.calls.borrow().iter().any(|c| c.join(" ") == args)
    }

    fn config(&self, args: &[String]) -> RawOutput {
        let mut store = self.store.borrow_mut();
        match args {
            [] => {
                let dump: String = store.iter().map(|(k, v)| format!("{} = {}\n", k, v)).collect();
                ok(&format!("[Setting]\n{}", dump))
            }
            [key] => ok(&format!("{}\n", store.get(key).cloned().unwrap_or_default())),
            [key, value] if DELTA_KEYS.contains(&key.as_str()) => {
                let mut tokens: Vec<String> = store
                    .get(key)
                    .map(|v| {
                        v.split('|')
                            .filter(|t| !t.is_empty())
                            .map(str::to_string)
                            .collect()
                    })
                    .unwrap_or_default();
                match value.strip_suffix('-') {
                    Some(gone) => tokens.retain(|t| t != gone),
                    None if !tokens.contains(value) => tokens.push(value.clone()),
                    None => {}
                }
                store.insert(key.clone(), tokens.join("|"));
                ok("success")
            }
            [key, value] => {
                store.insert(key.clone(), value.clone());
                ok("success")
            }
            _ => RawOutput {
                code: Some(1),
                stdout: String::new(),
                stderr: "bad config call".into(),
            },
        }
    }
}

fn ok(stdout: &str) -> RawOutput {
    RawOutput { code: Some(0), stdout: stdout.to_string(), stderr: String::new() }
}

impl ToolRunner for FakeSpicetify {
    fn run(&self, args: &[String]) -> Result<RawOutput, InvokeError> {
        if self.missing {
            return Err(InvokeError::NotFound {
                program: "spicetify".into(),
                install_dir: "/nowhere".into(),
            });
        }
        let args: Vec<String> = args
            .iter()
            .filter(|a| *a != "--bypass-admin" && *a != "-q")
            .cloned()
            .collect();
        self.calls.borrow_mut().push(args.clone());

        if args.first().map(String::as_str) == Some("config") {
            return Ok(self.config(&args[1..]));
        }
        Ok(self.replies.get(&args.join(" ")).cloned().unwrap_or_else(|| ok("")))
    }

    fn is_available(&self) -> bool {
        !self.missing
    }
}
