//! Route/receiver edits applied to a config value.
//!
//! Channels live as flat children of the root route, one route per
//! receiver, matched by receiver name. Nested routes are never touched.
//! Callers validate the result afterwards; these edits only enforce the
//! shape of the change request.

use crate::error::{ConfigError, Result};
use crate::schema::{Config, Receiver, Route};

fn check_request(route: &Route, receiver: &Receiver) -> Result<()> {
    if route.receiver.is_empty() || receiver.name.is_empty() {
        return Err(ConfigError::InvalidChange(
            "receiver is mandatory in route and receiver".to_string(),
        ));
    }
    Ok(())
}

fn root_mut(config: &mut Config) -> Result<&mut Route> {
    config
        .route
        .as_mut()
        .ok_or_else(|| ConfigError::validation("no route provided in config"))
}

impl Config {
    /// Append `route` as a new top-level child and `receiver` to the
    /// receiver list. Both names must be unused by any receiver or
    /// top-level route. The route always gets `continue: true`.
    pub fn add_route(&mut self, mut route: Route, receiver: Receiver) -> Result<()> {
        check_request(&route, &receiver)?;

        let root = self.route.as_ref();
        let taken = self
            .receivers
            .iter()
            .map(|r| r.name.as_str())
            .chain(root.into_iter().flat_map(|r| r.routes.iter().map(|c| c.receiver.as_str())));
        for name in taken {
            if name == receiver.name || name == route.receiver {
                return Err(ConfigError::InvalidChange(
                    "the channel name has to be unique, please choose a different name".to_string(),
                ));
            }
        }

        route.continue_matching = true;
        root_mut(self)?.routes.push(route);
        self.receivers.push(receiver);
        Ok(())
    }

    /// Replace the receiver with the same name and the first top-level
    /// route pointing at `route.receiver`. Missing entries are left alone.
    pub fn edit_route(&mut self, route: Route, receiver: Receiver) -> Result<()> {
        check_request(&route, &receiver)?;

        let root = root_mut(self)?;
        if let Some(slot) = root.routes.iter_mut().find(|r| r.receiver == route.receiver) {
            *slot = route;
        }
        if let Some(slot) = self.receivers.iter_mut().find(|r| r.name == receiver.name) {
            *slot = receiver;
        }
        Ok(())
    }

    /// Remove the first top-level route and the first receiver named `name`.
    pub fn delete_route(&mut self, name: &str) -> Result<()> {
        if name.is_empty() {
            return Err(ConfigError::InvalidChange(
                "delete receiver requires the receiver name".to_string(),
            ));
        }

        let root = root_mut(self)?;
        if let Some(i) = root.routes.iter().position(|r| r.receiver == name) {
            root.routes.remove(i);
        }
        if let Some(i) = self.receivers.iter().position(|r| r.name == name) {
            self.receivers.remove(i);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ConfigOpts;

    fn initial() -> Config {
        Config::initial(&ConfigOpts::default())
    }

    fn channel(name: &str) -> (Route, Receiver) {
        (Route::for_receiver(name), Receiver::new(name))
    }

    #[test]
    fn add_appends_with_continue() {
        let mut cfg = initial();
        let (mut route, receiver) = channel("slack-ops");
        route.continue_matching = false;
        cfg.add_route(route, receiver).unwrap();

        let root = cfg.root_route().unwrap();
        assert_eq!(root.routes.len(), 1);
        assert!(root.routes[0].continue_matching);
        assert_eq!(cfg.receivers.len(), 2);
        cfg.validate().unwrap();
    }

    #[test]
    fn add_rejects_name_collisions() {
        let mut cfg = initial();
        let (route, receiver) = channel("default-receiver");
        let err = cfg.add_route(route, receiver).unwrap_err();
        assert!(err.to_string().contains("has to be unique"));
        assert_eq!(cfg.receivers.len(), 1);
        assert!(cfg.root_route().unwrap().routes.is_empty());

        // A dangling top-level route also reserves its name.
        cfg.route.as_mut().unwrap().routes.push(Route::for_receiver("orphan"));
        let (route, receiver) = channel("orphan");
        assert!(cfg.add_route(route, receiver).is_err());
    }

    #[test]
    fn add_requires_names() {
        let mut cfg = initial();
        let err = cfg.add_route(Route::for_receiver(""), Receiver::new("x")).unwrap_err();
        assert_eq!(err.to_string(), "receiver is mandatory in route and receiver");
        assert!(cfg.add_route(Route::for_receiver("x"), Receiver::new("")).is_err());
    }

    #[test]
    fn add_then_delete_restores_counts() {
        let mut cfg = initial();
        let receivers = cfg.receivers.len();
        let routes = cfg.root_route().unwrap().routes.len();

        let (route, receiver) = channel("pager");
        cfg.add_route(route, receiver).unwrap();
        cfg.delete_route("pager").unwrap();

        assert_eq!(cfg.receivers.len(), receivers);
        assert_eq!(cfg.root_route().unwrap().routes.len(), routes);
    }

    #[test]
    fn edit_replaces_matching_entries_only() {
        let mut cfg = initial();
        let (route, receiver) = channel("hook");
        cfg.add_route(route, receiver).unwrap();

        let mut edited = Receiver::new("hook");
        edited.webhook_configs.push(serde_json::from_str(r#"{"url":"http://hook.local/v2"}"#).unwrap());
        let mut route = Route::for_receiver("hook");
        route.group_by = vec!["alertname".into()];
        cfg.edit_route(route, edited).unwrap();

        assert_eq!(cfg.receiver("hook").unwrap().webhook_configs.len(), 1);
        assert_eq!(cfg.root_route().unwrap().routes[0].group_by, ["alertname"]);

        // Unknown names are a no-op.
        let before = serde_json::to_string(&cfg).unwrap();
        let (route, receiver) = channel("nobody");
        cfg.edit_route(route, receiver).unwrap();
        assert_eq!(serde_json::to_string(&cfg).unwrap(), before);
    }

    #[test]
    fn delete_requires_a_name_and_ignores_unknown() {
        let mut cfg = initial();
        assert!(cfg.delete_route("").is_err());
        cfg.delete_route("missing").unwrap();
        assert_eq!(cfg.receivers.len(), 1);
    }
}
