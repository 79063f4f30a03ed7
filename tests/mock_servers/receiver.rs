//! Mock YNC receiver for testing
//!
//! Simulates the XML control endpoint at /YamahaRemoteControl/ctrl: power,
//! volume, input selection, per-source play info, tuner presets and the
//! stateful Net Radio / Server menus.

use axum::{extract::State, http::StatusCode, routing::post, Router};
use rn301_control::protocol::XmlElement;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

const PAGE_SIZE: usize = 8;

/// YNC code for a parameter the device does not accept.
pub const RC_INVALID: &str = "3";

/// One line of a menu; `children: None` marks a playable item.
#[derive(Debug, Clone)]
pub struct MockMenuEntry {
    pub text: String,
    pub children: Option<Vec<MockMenuEntry>>,
}

impl MockMenuEntry {
    pub fn item(text: &str) -> Self {
        Self {
            text: text.to_string(),
            children: None,
        }
    }

    pub fn container(text: &str, children: Vec<MockMenuEntry>) -> Self {
        Self {
            text: text.to_string(),
            children: Some(children),
        }
    }
}

/// Menu tree plus the device-side cursor into it.
#[derive(Debug, Clone, Default)]
struct MockMenu {
    name: String,
    root: Vec<MockMenuEntry>,
    /// Index chosen at each layer below the root.
    path: Vec<usize>,
    page: usize,
    busy_polls: u32,
}

impl MockMenu {
    fn entries(&self) -> &[MockMenuEntry] {
        let mut entries = self.root.as_slice();
        for index in &self.path {
            match entries.get(*index).and_then(|e| e.children.as_deref()) {
                Some(children) => entries = children,
                None => break,
            }
        }
        entries
    }

    fn title(&self) -> String {
        let mut title = self.name.clone();
        let mut entries = self.root.as_slice();
        for index in &self.path {
            if let Some(entry) = entries.get(*index) {
                title = entry.text.clone();
                entries = entry.children.as_deref().unwrap_or_default();
            }
        }
        title
    }

    fn layer(&self) -> usize {
        self.path.len() + 1
    }
}

/// Now-playing fields for one play-info endpoint
#[derive(Debug, Clone)]
pub struct MockPlayInfo {
    pub playback: String,
    pub artist: String,
    pub album: String,
    pub song: String,
    pub station: String,
    pub play_time: Option<u64>,
    pub shuffle: bool,
}

impl Default for MockPlayInfo {
    fn default() -> Self {
        Self {
            playback: "Stop".to_string(),
            artist: String::new(),
            album: String::new(),
            song: String::new(),
            station: String::new(),
            play_time: None,
            shuffle: false,
        }
    }
}

/// Mock receiver state
struct MockReceiverState {
    power: bool,
    volume: i64,
    max_volume: i64,
    muted: bool,
    input: String,
    play_info: HashMap<String, MockPlayInfo>,
    menus: HashMap<String, MockMenu>,
    /// Preset frequencies in hundredths of a MHz.
    presets: Vec<u32>,
    preset: Option<usize>,
    fail_status: Option<StatusCode>,
    reject_code: Option<String>,
    requests: Vec<String>,
}

/// Mock receiver
pub struct MockReceiver {
    addr: SocketAddr,
    state: Arc<RwLock<MockReceiverState>>,
    handle: JoinHandle<()>,
}

impl MockReceiver {
    /// Start a mock receiver on a random port, powered on, input `NET RADIO`
    /// and a 0-50 volume range.
    pub async fn start() -> Self {
        let state = Arc::new(RwLock::new(MockReceiverState {
            power: true,
            volume: 20,
            max_volume: 50,
            muted: false,
            input: "NET RADIO".to_string(),
            play_info: HashMap::new(),
            menus: HashMap::new(),
            presets: vec![8750, 9790, 10000, 10180, 10430, 10620, 10790, 10800],
            preset: None,
            fail_status: None,
            reject_code: None,
            requests: Vec::new(),
        }));

        let app = Router::new()
            .route("/YamahaRemoteControl/ctrl", post(handle_ctrl))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            state,
            handle,
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// `host:port` as the adapter configuration expects it
    pub fn host(&self) -> String {
        self.addr.to_string()
    }

    pub async fn set_power(&self, on: bool) {
        self.state.write().await.power = on;
    }

    pub async fn power(&self) -> bool {
        self.state.read().await.power
    }

    pub async fn set_max_volume(&self, max: i64) {
        self.state.write().await.max_volume = max;
    }

    pub async fn set_volume(&self, volume: i64) {
        self.state.write().await.volume = volume;
    }

    pub async fn volume(&self) -> i64 {
        self.state.read().await.volume
    }

    pub async fn muted(&self) -> bool {
        self.state.read().await.muted
    }

    /// Native input token, e.g. `"NET RADIO"`
    pub async fn set_input(&self, input: &str) {
        self.state.write().await.input = input.to_string();
    }

    pub async fn input(&self) -> String {
        self.state.read().await.input.clone()
    }

    pub async fn set_play_info(&self, endpoint: &str, info: MockPlayInfo) {
        self.state
            .write()
            .await
            .play_info
            .insert(endpoint.to_string(), info);
    }

    pub async fn play_info(&self, endpoint: &str) -> MockPlayInfo {
        self.state
            .read()
            .await
            .play_info
            .get(endpoint)
            .cloned()
            .unwrap_or_default()
    }

    /// Install a menu tree for `endpoint` with the cursor at the top.
    pub async fn set_menu(&self, endpoint: &str, name: &str, root: Vec<MockMenuEntry>) {
        self.state.write().await.menus.insert(
            endpoint.to_string(),
            MockMenu {
                name: name.to_string(),
                root,
                ..Default::default()
            },
        );
    }

    /// Report `Busy` for the next `polls` List_Info queries.
    pub async fn set_menu_busy(&self, endpoint: &str, polls: u32) {
        if let Some(menu) = self.state.write().await.menus.get_mut(endpoint) {
            menu.busy_polls = polls;
        }
    }

    /// Current menu layer (1 is the top menu)
    pub async fn menu_layer(&self, endpoint: &str) -> usize {
        self.state
            .read()
            .await
            .menus
            .get(endpoint)
            .map_or(0, MockMenu::layer)
    }

    /// 1-based preset, `None` when tuned off-preset
    pub async fn preset(&self) -> Option<usize> {
        self.state.read().await.preset.map(|p| p + 1)
    }

    /// Answer every request with this HTTP status instead of XML.
    pub async fn fail_with(&self, status: Option<StatusCode>) {
        self.state.write().await.fail_status = status;
    }

    /// Reject every PUT with this RC code.
    pub async fn reject_puts(&self, code: Option<&str>) {
        self.state.write().await.reject_code = code.map(str::to_string);
    }

    /// Requests received so far, as `GET Main_Zone/Basic_Status` or
    /// `PUT Main_Zone/Input/Input_Sel=NET RADIO`.
    pub async fn requests(&self) -> Vec<String> {
        self.state.read().await.requests.clone()
    }

    pub async fn clear_requests(&self) {
        self.state.write().await.requests.clear();
    }

    /// Stop the mock receiver
    pub async fn stop(self) {
        self.handle.abort();
    }
}

/// Follow single-child elements down to the addressed node.
fn addressed(section: &XmlElement) -> (Vec<&str>, &XmlElement) {
    let mut path = vec![section.tag.as_str()];
    let mut node = section;
    while let [only] = node.children.as_slice() {
        path.push(only.tag.as_str());
        node = only;
    }
    (path, node)
}

async fn handle_ctrl(
    State(state): State<Arc<RwLock<MockReceiverState>>>,
    body: String,
) -> Result<String, StatusCode> {
    let mut state = state.write().await;
    if let Some(status) = state.fail_status {
        return Err(status);
    }

    let doc = XmlElement::parse(&body).map_err(|_| StatusCode::BAD_REQUEST)?;
    let cmd = doc.attr("cmd").unwrap_or_default().to_string();
    let section = doc.children.first().ok_or(StatusCode::BAD_REQUEST)?;
    let (path, node) = addressed(section);
    let key = path.join("/");

    match cmd.as_str() {
        "GET" => {
            state.requests.push(format!("GET {}", key));
            let block = match path.as_slice() {
                ["Main_Zone", "Basic_Status"] => Some(basic_status(&state)),
                [endpoint, "Play_Info"] => Some(play_info(&state, endpoint)),
                [endpoint, "List_Info"] => list_info(&mut state, endpoint),
                _ => None,
            };
            Ok(match block {
                Some(block) => format!(
                    r#"<?xml version="1.0" encoding="utf-8"?><YAMAHA_AV rsp="GET" RC="0"><{0}>{1}</{0}></YAMAHA_AV>"#,
                    section.tag, block
                ),
                None => response("GET", RC_INVALID),
            })
        }
        "PUT" => {
            let value = if node.tag == "Lvl" {
                node.child_text("Val").unwrap_or_default().to_string()
            } else {
                node.text().to_string()
            };
            state.requests.push(format!("PUT {}={}", key, value));
            if let Some(code) = state.reject_code.clone() {
                return Ok(response("PUT", &code));
            }
            let accepted = apply_put(&mut state, &path, &value);
            Ok(response("PUT", if accepted { "0" } else { RC_INVALID }))
        }
        _ => Err(StatusCode::BAD_REQUEST),
    }
}

fn response(rsp: &str, code: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?><YAMAHA_AV rsp="{}" RC="{}"></YAMAHA_AV>"#,
        rsp, code
    )
}

fn on_off(on: bool) -> &'static str {
    if on {
        "On"
    } else {
        "Off"
    }
}

/// The device sends ampersands escaped twice.
fn device_text(text: &str) -> String {
    text.replace('&', "&amp;amp;")
}

fn basic_status(state: &MockReceiverState) -> String {
    format!(
        "<Basic_Status><Power_Control><Power>{}</Power><Sleep>Off</Sleep></Power_Control>\
         <Volume><Lvl><Val>{}</Val><Exp>0</Exp><Unit></Unit></Lvl><Mute>{}</Mute></Volume>\
         <Input><Input_Sel>{}</Input_Sel><Input_Sel_Item_Info><Param>{}</Param></Input_Sel_Item_Info></Input>\
         </Basic_Status>",
        if state.power { "On" } else { "Standby" },
        state.volume,
        on_off(state.muted),
        state.input,
        state.input
    )
}

fn play_info(state: &MockReceiverState, endpoint: &str) -> String {
    if endpoint == "Tuner" {
        let preset = state
            .preset
            .map_or_else(|| "No Preset".to_string(), |p| (p + 1).to_string());
        let freq = state
            .preset
            .and_then(|p| state.presets.get(p))
            .copied()
            .unwrap_or(8750);
        return format!(
            "<Play_Info><Feature_Availability>Ready</Feature_Availability><Search_Mode>Preset</Search_Mode>\
             <Preset><Preset_Sel>{}</Preset_Sel></Preset>\
             <Tuning><Band>FM</Band><Freq><Current><Val>{}</Val><Exp>2</Exp><Unit>MHz</Unit></Current></Freq></Tuning>\
             <Signal_Info><Tuned>Assert</Tuned><Stereo>Assert</Stereo></Signal_Info></Play_Info>",
            preset, freq
        );
    }

    let info = state.play_info.get(endpoint).cloned().unwrap_or_default();
    let mut meta = String::new();
    for (tag, value) in [
        ("Artist", &info.artist),
        ("Album", &info.album),
        ("Song", &info.song),
        ("Station", &info.station),
    ] {
        meta.push_str(&format!("<{0}>{1}</{0}>", tag, device_text(value)));
    }
    let play_time = info
        .play_time
        .map(|t| format!("<Play_Time>{}</Play_Time>", t))
        .unwrap_or_default();
    format!(
        "<Play_Info><Feature_Availability>Ready</Feature_Availability><Playback_Info>{}</Playback_Info>\
         <Play_Mode>{}</Play_Mode>{}<Meta_Info>{}</Meta_Info></Play_Info>",
        info.playback,
        on_off(info.shuffle),
        play_time,
        meta
    )
}

fn list_info(state: &mut MockReceiverState, endpoint: &str) -> Option<String> {
    let menu = state.menus.get_mut(endpoint)?;
    if menu.busy_polls > 0 {
        menu.busy_polls -= 1;
        return Some(format!(
            "<List_Info><Menu_Status>Busy</Menu_Status><Menu_Layer>{}</Menu_Layer><Menu_Name></Menu_Name>\
             <Current_List></Current_List><Cursor_Position><Current_Line>0</Current_Line><Max_Line>0</Max_Line></Cursor_Position></List_Info>",
            menu.layer()
        ));
    }

    let entries = menu.entries();
    let first = menu.page * PAGE_SIZE;
    let mut lines = String::new();
    for line in 1..=PAGE_SIZE {
        let (text, attribute) = match entries.get(first + line - 1) {
            Some(entry) if entry.children.is_some() => (entry.text.as_str(), "Container"),
            Some(entry) => (entry.text.as_str(), "Item"),
            None => ("", "Unselectable"),
        };
        lines.push_str(&format!(
            "<Line_{0}><Txt>{1}</Txt><Attribute>{2}</Attribute></Line_{0}>",
            line, text, attribute
        ));
    }
    Some(format!(
        "<List_Info><Menu_Status>Ready</Menu_Status><Menu_Layer>{}</Menu_Layer><Menu_Name>{}</Menu_Name>\
         <Current_List>{}</Current_List><Cursor_Position><Current_Line>{}</Current_Line><Max_Line>{}</Max_Line></Cursor_Position></List_Info>",
        menu.layer(),
        menu.title(),
        lines,
        if entries.is_empty() { 0 } else { first + 1 },
        entries.len()
    ))
}

fn apply_put(state: &mut MockReceiverState, path: &[&str], value: &str) -> bool {
    match path {
        ["System", "Power_Control", "Power"] => match value {
            "On" => state.power = true,
            "Standby" => state.power = false,
            _ => return false,
        },
        ["System", "Volume", "Mute"] => state.muted = value == "On",
        ["Main_Zone", "Volume", "Lvl"] => match value.parse::<i64>() {
            Ok(level) if (0..=state.max_volume).contains(&level) => state.volume = level,
            _ => return false,
        },
        ["Main_Zone", "Input", "Input_Sel"] => state.input = value.to_string(),
        ["Tuner", "Play_Control", "Preset", "Preset_Sel"] => match value.parse::<usize>() {
            Ok(p) if (1..=state.presets.len()).contains(&p) => state.preset = Some(p - 1),
            _ => return false,
        },
        [endpoint, "Play_Control", "Playback"] => {
            let info = state.play_info.entry(endpoint.to_string()).or_default();
            match value {
                "Play" | "Pause" | "Stop" => info.playback = value.to_string(),
                "Skip Fwd" | "Skip Rev" => info.play_time = Some(0),
                _ => return false,
            }
        }
        [endpoint, "Play_Control", "Play_Mode", "Shuffle"] => {
            let info = state.play_info.entry(endpoint.to_string()).or_default();
            info.shuffle = value == "On";
        }
        [endpoint, "List_Control", action] => return apply_list_control(state, endpoint, action, value),
        _ => return false,
    }
    true
}

fn apply_list_control(
    state: &mut MockReceiverState,
    endpoint: &str,
    action: &str,
    value: &str,
) -> bool {
    let Some(menu) = state.menus.get_mut(endpoint) else {
        return false;
    };
    match (action, value) {
        ("Cursor", "Return") => {
            menu.path.pop();
            menu.page = 0;
        }
        ("Page", "Down") => {
            if (menu.page + 1) * PAGE_SIZE < menu.entries().len() {
                menu.page += 1;
            }
        }
        ("Page", "Up") => menu.page = menu.page.saturating_sub(1),
        ("Direct_Sel", line) => {
            let Some(line) = line
                .strip_prefix("Line_")
                .and_then(|n| n.parse::<usize>().ok())
                .filter(|n| (1..=PAGE_SIZE).contains(n))
            else {
                return false;
            };
            let index = menu.page * PAGE_SIZE + line - 1;
            let Some(entry) = menu.entries().get(index).cloned() else {
                return false;
            };
            if entry.children.is_some() {
                menu.path.push(index);
                menu.page = 0;
            } else {
                let title = menu.title();
                let info = state.play_info.entry(endpoint.to_string()).or_default();
                info.song = entry.text;
                info.station = title;
                info.playback = "Play".to_string();
            }
        }
        _ => return false,
    }
    true
}
