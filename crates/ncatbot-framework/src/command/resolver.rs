//! Maps the leading words of a command line to a registered command.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::trace;

use crate::command::registry::RegisteredCommand;
use crate::command::tokenizer::{Token, tokenize};
use crate::config::{TriggerConfig, match_prefix};

/// A resolved command and the words that selected it, as written.
#[derive(Debug, Clone)]
pub struct Match {
    pub command: Arc<RegisteredCommand>,
    pub path_words: Vec<String>,
}

/// A frozen lookup index over the registry.
///
/// Built once; lookups are pure and take no locks.
#[derive(Debug, Default)]
pub struct CommandResolver {
    paths: HashMap<Vec<String>, Arc<RegisteredCommand>>,
    aliases: HashMap<String, Arc<RegisteredCommand>>,
    max_depth: usize,
    prefixes: Vec<String>,
    case_sensitive: bool,
}

impl CommandResolver {
    pub fn build(commands: &[Arc<RegisteredCommand>], config: &TriggerConfig) -> Self {
        let mut resolver = Self {
            prefixes: config.prefixes.clone(),
            case_sensitive: config.case_sensitive,
            ..Self::default()
        };
        for command in commands {
            let key: Vec<String> = command.path.iter().map(|w| resolver.normalize(w)).collect();
            resolver.max_depth = resolver.max_depth.max(key.len());
            resolver.paths.insert(key, command.clone());
            for alias in &command.spec.aliases {
                let alias = resolver.normalize(alias);
                resolver.aliases.insert(alias, command.clone());
            }
        }
        trace!(
            paths = resolver.paths.len(),
            aliases = resolver.aliases.len(),
            max_depth = resolver.max_depth,
            "Built command index"
        );
        resolver
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn alias_count(&self) -> usize {
        self.aliases.len()
    }

    fn normalize(&self, word: &str) -> String {
        if self.case_sensitive {
            word.to_string()
        } else {
            word.to_lowercase()
        }
    }

    /// Resolves a command line as found by the preprocessor. The prefix is
    /// removed before tokenizing, so prefixes may contain spaces (`"bot "`).
    pub fn resolve(&self, command_text: &str) -> Option<Match> {
        let text = command_text.trim_start();
        let text = match_prefix(text, &self.prefixes, self.case_sensitive).map_or(text, |(_, rest)| rest);
        let tokens = tokenize(text);
        self.lookup(&self.leading_words(&tokens))
    }

    /// Tries the leading words at increasing lengths; aliases only match a
    /// single word. The first word may carry a command prefix.
    pub fn resolve_from_tokens(&self, tokens: &[Token]) -> Option<Match> {
        let mut words = self.leading_words(tokens);
        let first = words.first_mut()?;
        if let Some((_, rest)) = match_prefix(*first, &self.prefixes, self.case_sensitive) {
            *first = rest;
        }
        self.lookup(&words)
    }

    fn leading_words<'t>(&self, tokens: &'t [Token]) -> Vec<&'t str> {
        tokens
            .iter()
            .take(self.max_depth)
            .map_while(Token::as_word)
            .collect()
    }

    fn lookup(&self, words: &[&str]) -> Option<Match> {
        let mut key = Vec::with_capacity(words.len());
        for (i, word) in words.iter().enumerate() {
            key.push(self.normalize(word));
            let hit = self.paths.get(&key).or_else(|| {
                (i == 0)
                    .then(|| self.aliases.get(&key[0]))
                    .flatten()
            });
            if let Some(command) = hit {
                return Some(Match {
                    command: command.clone(),
                    path_words: words[..=i].iter().map(|w| w.to_string()).collect(),
                });
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::registry::UnifiedRegistry;
    use crate::command::tokenizer::tokenize;
    use crate::handler::sync_handler;

    fn registry() -> UnifiedRegistry {
        let registry = UnifiedRegistry::new();
        registry
            .command("hello", sync_handler(|_| Ok(())))
            .alias("hi")
            .register()
            .unwrap();
        registry
            .group("admin")
            .command("user", sync_handler(|_| Ok(())))
            .alias("au")
            .register()
            .unwrap();
        registry
    }

    fn resolve(resolver: &CommandResolver, line: &str) -> Option<(String, Vec<String>)> {
        resolver
            .resolve_from_tokens(&tokenize(line))
            .map(|m| (m.command.path_string(), m.path_words))
    }

    #[test]
    fn test_resolve_paths_and_aliases() {
        let resolver = CommandResolver::build(&registry().commands(), &TriggerConfig::default());
        assert_eq!(resolver.len(), 2);
        assert_eq!(resolver.alias_count(), 2);

        assert_eq!(
            resolve(&resolver, "/hello world"),
            Some(("hello".into(), vec!["hello".into()]))
        );
        assert_eq!(
            resolve(&resolver, "!admin user 123"),
            Some(("admin user".into(), vec!["admin".into(), "user".into()]))
        );
        assert_eq!(resolve(&resolver, "/au").unwrap().0, "admin user");
        assert_eq!(resolve(&resolver, "/HI").unwrap().0, "hello");
    }

    #[test]
    fn test_no_match() {
        let resolver = CommandResolver::build(&registry().commands(), &TriggerConfig::default());
        assert!(resolve(&resolver, "/admin").is_none());
        assert!(resolve(&resolver, "/unknown").is_none());
        assert!(resolve(&resolver, "--hello").is_none());
        assert!(resolver.resolve_from_tokens(&[]).is_none());
        // Aliases only stand for a single word.
        assert!(resolve(&resolver, "/admin au").is_none());
        // Quoted text is an argument, never a command word.
        assert!(resolve(&resolver, r#""/hello""#).is_none());
        assert!(resolve(&resolver, r#"/admin "user""#).is_none());
    }

    #[test]
    fn test_resolve_spaced_prefix() {
        let config = TriggerConfig::default().prefixes(["bot "]);
        let resolver = CommandResolver::build(&registry().commands(), &config);
        let matched = resolver.resolve("BOT admin user 1").unwrap();
        assert_eq!(matched.command.path_string(), "admin user");
        assert_eq!(matched.path_words, vec!["admin", "user"]);
        assert!(resolver.resolve("bot  hi").is_some());
        assert!(resolver.resolve(r#"bot "hello""#).is_none());
    }

    #[test]
    fn test_case_sensitive() {
        let config = TriggerConfig::default().case_sensitive(true);
        let resolver = CommandResolver::build(&registry().commands(), &config);
        assert!(resolve(&resolver, "/Hello").is_none());
        assert!(resolve(&resolver, "/hello").is_some());
    }

    #[test]
    fn test_deterministic() {
        let resolver = CommandResolver::build(&registry().commands(), &TriggerConfig::default());
        let first = resolve(&resolver, "/admin user x");
        for _ in 0..10 {
            assert_eq!(resolve(&resolver, "/admin user x"), first);
        }
    }
}
