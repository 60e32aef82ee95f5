/// Background service worker wiring: browser-backed host, store and timer

use crate::config::GrouperConfig;
use crate::error::{HostError, StoreError};
use crate::grouper::Grouper;
use crate::host::{Clock, TabHost, Ticker};
use crate::operations::Command;
use crate::rules::RuleSet;
use crate::storage::{AvailableGroups, RuleStore, Settings, AVAILABLE_GROUPS_KEY, RULES_KEY, SETTINGS_KEY};
use crate::tab_data::{GroupId, GroupInfo, GroupUpdate, TabId, TabInfo};
use async_trait::async_trait;
use log::{debug, info, warn};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;

// Import JS bridge functions
#[wasm_bindgen(module = "/background.js")]
extern "C" {
    #[wasm_bindgen(catch)]
    async fn queryGroups() -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn getGroup(group_id: i32) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn groupTabs(tab_ids: JsValue, group_id: Option<i32>) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn updateGroup(group_id: i32, props: JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn queryTabs() -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn getTab(tab_id: i32) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn getStorage(key: &str) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn setStorage(key: &str, value: JsValue) -> Result<(), JsValue>;

    fn onInstalled(callback: &Closure<dyn FnMut()>);

    fn onNavigationComplete(callback: &Closure<dyn FnMut(JsValue)>);

    fn onTabActivated(callback: &Closure<dyn FnMut(i32)>);

    fn onGroupUpdated(callback: &Closure<dyn FnMut(JsValue)>);

    fn onGroupRemoved(callback: &Closure<dyn FnMut(i32)>);

    fn onCommand(callback: &Closure<dyn FnMut(JsValue)>);

    fn onActionClicked(callback: &Closure<dyn FnMut()>);

    fn onSettingsChanged(callback: &Closure<dyn FnMut(JsValue)>);

    fn startTicker(callback: &Closure<dyn FnMut()>, interval_ms: u32) -> i32;

    fn stopTicker(handle: i32);
}

fn js_message(value: &JsValue) -> String {
    value
        .dyn_ref::<js_sys::Error>()
        .map(|e| String::from(e.message()))
        .or_else(|| value.as_string())
        .unwrap_or_else(|| format!("{:?}", value))
}

fn to_js<T: Serialize + ?Sized>(value: &T) -> Result<JsValue, serde_wasm_bindgen::Error> {
    // plain objects rather than ES maps, as chrome.* and storage expect
    value.serialize(&serde_wasm_bindgen::Serializer::json_compatible())
}

fn host_error(value: JsValue) -> HostError {
    HostError::from_message(js_message(&value))
}

fn decode_host<T: DeserializeOwned>(value: JsValue) -> Result<T, HostError> {
    serde_wasm_bindgen::from_value(value).map_err(|e| HostError::Decode(e.to_string()))
}

/// `chrome.tabs` / `chrome.tabGroups` through the bridge
struct JsHost;

#[async_trait(?Send)]
impl TabHost for JsHost {
    async fn query_groups(&self) -> Result<Vec<GroupInfo>, HostError> {
        decode_host(queryGroups().await.map_err(host_error)?)
    }

    async fn get_group(&self, group_id: GroupId) -> Result<GroupInfo, HostError> {
        decode_host(getGroup(group_id.0).await.map_err(host_error)?)
    }

    async fn group_tabs(&self, tabs: &[TabId], group_id: Option<GroupId>) -> Result<GroupId, HostError> {
        let tab_ids = to_js(tabs).map_err(|e| HostError::Decode(e.to_string()))?;
        let value = groupTabs(tab_ids, group_id.map(|id| id.0))
            .await
            .map_err(host_error)?;
        value
            .as_f64()
            .map(|id| GroupId(id as i32))
            .ok_or_else(|| HostError::Decode(format!("group id {:?}", value)))
    }

    async fn update_group(&self, group_id: GroupId, update: &GroupUpdate) -> Result<GroupInfo, HostError> {
        let props = to_js(update).map_err(|e| HostError::Decode(e.to_string()))?;
        decode_host(updateGroup(group_id.0, props).await.map_err(host_error)?)
    }

    async fn query_tabs(&self) -> Result<Vec<TabInfo>, HostError> {
        decode_host(queryTabs().await.map_err(host_error)?)
    }

    async fn get_tab(&self, tab_id: TabId) -> Result<TabInfo, HostError> {
        decode_host(getTab(tab_id.0).await.map_err(host_error)?)
    }
}

/// `chrome.storage.sync` through the bridge
struct JsStore;

impl JsStore {
    async fn load<T: DeserializeOwned + Default>(&self, key: &str) -> Result<T, StoreError> {
        let value = getStorage(key).await.map_err(|e| StoreError::Read {
            key: key.to_string(),
            message: js_message(&e),
        })?;

        if value.is_null() || value.is_undefined() {
            return Ok(T::default());
        }

        serde_wasm_bindgen::from_value(value).map_err(|e| StoreError::Decode {
            key: key.to_string(),
            message: e.to_string(),
        })
    }

    async fn save<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let value = to_js(value).map_err(|e| StoreError::Write {
            key: key.to_string(),
            message: e.to_string(),
        })?;

        setStorage(key, value).await.map_err(|e| StoreError::Write {
            key: key.to_string(),
            message: js_message(&e),
        })
    }
}

#[async_trait(?Send)]
impl RuleStore for JsStore {
    async fn load_rules(&self) -> Result<RuleSet, StoreError> {
        self.load(RULES_KEY).await
    }

    async fn save_rules(&self, rules: &RuleSet) -> Result<(), StoreError> {
        self.save(RULES_KEY, rules).await
    }

    async fn load_available_groups(&self) -> Result<AvailableGroups, StoreError> {
        self.load(AVAILABLE_GROUPS_KEY).await
    }

    async fn save_available_groups(&self, groups: &AvailableGroups) -> Result<(), StoreError> {
        self.save(AVAILABLE_GROUPS_KEY, groups).await
    }

    async fn load_settings(&self) -> Result<Settings, StoreError> {
        self.load(SETTINGS_KEY).await
    }
}

struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> f64 {
        js_sys::Date::now()
    }
}

/// `setInterval` timer; the tick callback is attached once the grouper exists
#[derive(Default)]
struct IntervalTicker {
    handle: Cell<Option<i32>>,
    callback: RefCell<Option<Closure<dyn FnMut()>>>,
}

impl IntervalTicker {
    fn set_callback(&self, callback: Closure<dyn FnMut()>) {
        *self.callback.borrow_mut() = Some(callback);
    }
}

impl Ticker for Rc<IntervalTicker> {
    fn start(&self, interval: Duration) {
        if self.handle.get().is_some() {
            return;
        }
        if let Some(callback) = self.callback.borrow().as_ref() {
            let interval_ms = u32::try_from(interval.as_millis()).unwrap_or(u32::MAX);
            self.handle.set(Some(startTicker(callback, interval_ms)));
        }
    }

    fn stop(&self) {
        if let Some(handle) = self.handle.take() {
            stopTicker(handle);
        }
    }
}

/// Build the grouper and subscribe it to browser events
pub fn start(config: GrouperConfig) {
    let ticker = Rc::new(IntervalTicker::default());
    let grouper = Rc::new(Grouper::new(JsHost, JsStore, SystemClock, ticker.clone(), config));

    let weak = Rc::downgrade(&grouper);
    ticker.set_callback(Closure::new(move || {
        if let Some(grouper) = weak.upgrade() {
            spawn_local(async move {
                grouper.idle_tick().await;
            });
        }
    }));

    register_listeners(&grouper);

    spawn_local(async move {
        grouper.initialize().await;
        info!("Tab grouper ready");
    });
}

fn register_listeners(grouper: &Rc<Grouper>) {
    let installed = {
        let grouper = grouper.clone();
        Closure::<dyn FnMut()>::new(move || {
            let grouper = grouper.clone();
            spawn_local(async move { grouper.on_installed().await });
        })
    };
    onInstalled(&installed);
    installed.forget();

    let navigated = {
        let grouper = grouper.clone();
        Closure::<dyn FnMut(JsValue)>::new(move |tab: JsValue| {
            let tab: TabInfo = match serde_wasm_bindgen::from_value(tab) {
                Ok(tab) => tab,
                Err(e) => {
                    warn!("Ignoring undecodable tab: {}", e);
                    return;
                }
            };
            let grouper = grouper.clone();
            spawn_local(async move {
                grouper.on_navigation_complete(&tab).await;
            });
        })
    };
    onNavigationComplete(&navigated);
    navigated.forget();

    let activated = {
        let grouper = grouper.clone();
        Closure::<dyn FnMut(i32)>::new(move |tab_id: i32| {
            let grouper = grouper.clone();
            spawn_local(async move { grouper.on_tab_activated(TabId(tab_id)).await });
        })
    };
    onTabActivated(&activated);
    activated.forget();

    let group_updated = {
        let grouper = grouper.clone();
        Closure::<dyn FnMut(JsValue)>::new(move |group: JsValue| {
            let group: GroupInfo = match serde_wasm_bindgen::from_value(group) {
                Ok(group) => group,
                Err(e) => {
                    warn!("Ignoring undecodable group: {}", e);
                    return;
                }
            };
            let grouper = grouper.clone();
            spawn_local(async move { grouper.on_group_updated(&group).await });
        })
    };
    onGroupUpdated(&group_updated);
    group_updated.forget();

    let group_removed = {
        let grouper = grouper.clone();
        Closure::<dyn FnMut(i32)>::new(move |group_id: i32| {
            let grouper = grouper.clone();
            spawn_local(async move { grouper.on_group_removed(GroupId(group_id)).await });
        })
    };
    onGroupRemoved(&group_removed);
    group_removed.forget();

    let command = {
        let grouper = grouper.clone();
        Closure::<dyn FnMut(JsValue)>::new(move |message: JsValue| {
            match serde_wasm_bindgen::from_value::<Command>(message) {
                Ok(command) => {
                    let grouper = grouper.clone();
                    spawn_local(async move { grouper.handle_command(command).await });
                }
                Err(e) => debug!("Ignoring unknown message: {}", e),
            }
        })
    };
    onCommand(&command);
    command.forget();

    let action = {
        let grouper = grouper.clone();
        Closure::<dyn FnMut()>::new(move || {
            let grouper = grouper.clone();
            spawn_local(async move { grouper.handle_command(Command::GroupTabs).await });
        })
    };
    onActionClicked(&action);
    action.forget();

    let settings_changed = {
        let grouper = grouper.clone();
        Closure::<dyn FnMut(JsValue)>::new(move |value: JsValue| {
            let settings = if value.is_null() || value.is_undefined() {
                Settings::default()
            } else {
                match serde_wasm_bindgen::from_value(value) {
                    Ok(settings) => settings,
                    Err(e) => {
                        warn!("Ignoring malformed settings: {}", e);
                        return;
                    }
                }
            };
            grouper.on_settings_changed(settings);
        })
    };
    onSettingsChanged(&settings_changed);
    settings_changed.forget();
}
