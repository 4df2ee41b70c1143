//! Request types the client issues and the response shapes it reads back.
//!
//! Only the small surface a recording controller needs is modelled; any
//! other request can still be sent untyped through the client's generic
//! request call.

use serde::{Deserialize, Serialize};

pub const START_RECORD: &str = "StartRecord";
pub const STOP_RECORD: &str = "StopRecord";
pub const GET_RECORD_STATUS: &str = "GetRecordStatus";
pub const SET_CURRENT_PROGRAM_SCENE: &str = "SetCurrentProgramScene";
pub const GET_SCENE_LIST: &str = "GetSceneList";

/// Event emitted when recording starts or stops.
pub const EVENT_RECORD_STATE_CHANGED: &str = "RecordStateChanged";
/// Event emitted when the program scene switches.
pub const EVENT_CURRENT_PROGRAM_SCENE_CHANGED: &str = "CurrentProgramSceneChanged";
/// Event emitted when the tool begins shutting down.
pub const EVENT_EXIT_STARTED: &str = "ExitStarted";

/// `responseData` of `GetRecordStatus`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordStatus {
    pub output_active: bool,
    #[serde(default)]
    pub output_paused: bool,
    #[serde(default)]
    pub output_timecode: Option<String>,
}

/// `requestData` of `SetCurrentProgramScene`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetCurrentProgramScene {
    pub scene_name: String,
}

/// `responseData` of `GetSceneList`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneList {
    #[serde(default)]
    pub current_program_scene_name: Option<String>,
    #[serde(default)]
    pub scenes: Vec<SceneEntry>,
}

/// One entry of [`SceneList::scenes`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneEntry {
    #[serde(default)]
    pub scene_name: String,
    #[serde(default)]
    pub scene_index: Option<u32>,
}

impl SceneList {
    /// Scene names in the order the server listed them.
    ///
    /// Entries without a name are skipped.
    pub fn names(&self) -> Vec<String> {
        self.scenes
            .iter()
            .filter(|s| !s.scene_name.is_empty())
            .map(|s| s.scene_name.clone())
            .collect()
    }
}

/// Data carried by a `RecordStateChanged` event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordStateChanged {
    pub output_active: bool,
    #[serde(default)]
    pub output_state: Option<String>,
    #[serde(default)]
    pub output_path: Option<String>,
}
