use std::collections::BTreeMap;

use kube::api::ListParams;

pub const COMPONENT_NAME: &str = "submariner-lighthouse";

pub fn get_lighthouse_labels(app: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        ("app".to_owned(), app.to_owned()),
        ("component".to_owned(), COMPONENT_NAME.to_owned()),
    ])
}

pub fn get_lighthouse_selector(app: &str) -> BTreeMap<String, String> {
    BTreeMap::from([("app".to_owned(), app.to_owned())])
}

pub fn get_joined_lighthouse_selector(app: &str) -> String {
    format!("app={app}")
}

pub fn get_lighthouse_listparams(app: &str) -> ListParams {
    ListParams::default().labels(&get_joined_lighthouse_selector(app))
}

pub fn get_operator_labels(name: &str) -> BTreeMap<String, String> {
    BTreeMap::from([("name".to_owned(), name.to_owned())])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selector_is_a_subset_of_labels() {
        let labels = get_lighthouse_labels("submariner-lighthouse-agent");
        let selector = get_lighthouse_selector("submariner-lighthouse-agent");

        assert!(selector.iter().all(|(k, v)| labels.get(k) == Some(v)));
        assert_eq!(labels.get("component").map(String::as_str), Some(COMPONENT_NAME));
    }

    #[test]
    fn listparams_select_by_app_label() {
        let params = get_lighthouse_listparams("submariner-lighthouse-agent");

        assert_eq!(
            params.label_selector.as_deref(),
            Some("app=submariner-lighthouse-agent")
        );
    }
}
