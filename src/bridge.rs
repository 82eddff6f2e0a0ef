// Hue bridge client
// Thin wrapper over the CLIP v2 REST API: rooms/zones with grouped-light
// state, scenes, sensors and buttons. The bridge serves HTTPS with a
// self-signed certificate, so verification is disabled for this client.

use crate::{Error, Result};
use reqwest::header::{HeaderMap, HeaderValue};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::time::Duration;

/// A room or zone with the aggregate on/off state of its grouped light
#[derive(Debug, Clone)]
pub struct Zone {
    pub id: String,
    pub name: String,
    pub grouped_light_id: String,
    pub lights_on: bool,
}

/// A scene saved on the bridge, owned by a room or zone
#[derive(Debug, Clone)]
pub struct Scene {
    pub id: String,
    pub name: String,
    pub zone_id: String,
}

#[derive(Debug, Clone)]
pub struct MotionReading {
    pub id: String,
    pub device_name: String,
    pub active: bool,
}

#[derive(Debug, Clone)]
pub struct ContactReading {
    pub id: String,
    pub device_name: String,
    pub closed: bool,
}

#[derive(Debug, Clone)]
pub struct TemperatureReading {
    pub id: String,
    pub device_name: String,
    pub celsius: f64,
}

#[derive(Debug, Clone)]
pub struct ButtonReading {
    pub id: String,
    pub device_name: String,
    pub control_id: u8,
    pub last_event: String,
    /// Report timestamp, used for press edge detection
    pub updated: String,
}

#[derive(Debug, Deserialize)]
struct ApiReply {
    #[serde(default)]
    errors: Vec<ApiError>,
    #[serde(default)]
    data: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    description: String,
}

#[derive(Debug, Deserialize)]
struct ResourceRef {
    rid: String,
    rtype: String,
}

#[derive(Debug, Deserialize)]
struct Metadata {
    name: String,
}

#[derive(Debug, Deserialize)]
struct GroupResource {
    id: String,
    metadata: Metadata,
    #[serde(default)]
    services: Vec<ResourceRef>,
}

#[derive(Debug, Deserialize)]
struct OnState {
    on: bool,
}

#[derive(Debug, Deserialize)]
struct GroupedLightResource {
    id: String,
    #[serde(default)]
    on: Option<OnState>,
}

#[derive(Debug, Deserialize)]
struct SceneResource {
    id: String,
    metadata: Metadata,
    group: ResourceRef,
}

#[derive(Debug, Deserialize)]
struct DeviceResource {
    id: String,
    metadata: Metadata,
}

#[derive(Debug, Deserialize)]
struct MotionReport {
    motion: bool,
}

#[derive(Debug, Deserialize)]
struct MotionState {
    #[serde(default)]
    motion: Option<bool>,
    #[serde(default)]
    motion_report: Option<MotionReport>,
}

#[derive(Debug, Deserialize)]
struct MotionResource {
    id: String,
    owner: ResourceRef,
    motion: MotionState,
}

#[derive(Debug, Deserialize)]
struct ContactReport {
    state: String,
}

#[derive(Debug, Deserialize)]
struct ContactResource {
    id: String,
    owner: ResourceRef,
    #[serde(default)]
    contact_report: Option<ContactReport>,
}

#[derive(Debug, Deserialize)]
struct TemperatureState {
    temperature: f64,
}

#[derive(Debug, Deserialize)]
struct TemperatureResource {
    id: String,
    owner: ResourceRef,
    temperature: TemperatureState,
}

#[derive(Debug, Deserialize)]
struct ButtonMetadata {
    control_id: u8,
}

#[derive(Debug, Deserialize)]
struct ButtonReport {
    event: String,
    updated: String,
}

#[derive(Debug, Deserialize)]
struct ButtonState {
    #[serde(default)]
    button_report: Option<ButtonReport>,
}

#[derive(Debug, Deserialize)]
struct ButtonResource {
    id: String,
    owner: ResourceRef,
    metadata: ButtonMetadata,
    #[serde(default)]
    button: Option<ButtonState>,
}

pub struct BridgeClient {
    client: reqwest::Client,
    base_url: String,
}

impl BridgeClient {
    /// Create a client for the bridge at `address` using a paired application key
    pub fn new(address: &str, app_key: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(app_key)
            .map_err(|_| Error::bridge("application key contains invalid characters"))?;
        headers.insert("hue-application-key", key);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .danger_accept_invalid_certs(true)
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            base_url: format!("https://{}/clip/v2/resource", address),
        })
    }

    async fn get_resources(&self, kind: &str) -> Result<Vec<serde_json::Value>> {
        let url = format!("{}/{}", self.base_url, kind);
        let reply: ApiReply = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(error) = reply.errors.first() {
            return Err(Error::bridge(format!(
                "listing {} failed: {}",
                kind, error.description
            )));
        }
        Ok(reply.data)
    }

    fn parse_all<T: serde::de::DeserializeOwned>(data: Vec<serde_json::Value>) -> Vec<T> {
        // resources that fail to parse are skipped, not fatal; bridges expose
        // resource variants this client does not model
        data.into_iter()
            .filter_map(|value| serde_json::from_value(value).ok())
            .collect()
    }

    /// List rooms and zones, merged with their grouped light's on state
    pub async fn zones(&self) -> Result<Vec<Zone>> {
        let grouped: Vec<GroupedLightResource> =
            Self::parse_all(self.get_resources("grouped_light").await?);
        let on_by_id: HashMap<String, bool> = grouped
            .into_iter()
            .map(|g| (g.id, g.on.map(|o| o.on).unwrap_or(false)))
            .collect();

        let mut zones = Vec::new();
        for kind in ["room", "zone"] {
            let groups: Vec<GroupResource> = Self::parse_all(self.get_resources(kind).await?);
            for group in groups {
                let Some(grouped_light) = group
                    .services
                    .iter()
                    .find(|service| service.rtype == "grouped_light")
                else {
                    continue;
                };
                zones.push(Zone {
                    lights_on: on_by_id.get(&grouped_light.rid).copied().unwrap_or(false),
                    grouped_light_id: grouped_light.rid.clone(),
                    id: group.id,
                    name: group.metadata.name,
                });
            }
        }
        Ok(zones)
    }

    /// List all scenes on the bridge
    pub async fn scenes(&self) -> Result<Vec<Scene>> {
        let scenes: Vec<SceneResource> = Self::parse_all(self.get_resources("scene").await?);
        Ok(scenes
            .into_iter()
            .map(|scene| Scene {
                id: scene.id,
                name: scene.metadata.name,
                zone_id: scene.group.rid,
            })
            .collect())
    }

    /// Device id to device name, for attaching names to sensor resources
    async fn device_names(&self) -> Result<HashMap<String, String>> {
        let devices: Vec<DeviceResource> = Self::parse_all(self.get_resources("device").await?);
        Ok(devices
            .into_iter()
            .map(|device| (device.id, device.metadata.name))
            .collect())
    }

    pub async fn motion_sensors(&self) -> Result<Vec<MotionReading>> {
        let names = self.device_names().await?;
        let sensors: Vec<MotionResource> = Self::parse_all(self.get_resources("motion").await?);
        Ok(sensors
            .into_iter()
            .map(|sensor| {
                let active = sensor
                    .motion
                    .motion_report
                    .map(|report| report.motion)
                    .or(sensor.motion.motion)
                    .unwrap_or(false);
                MotionReading {
                    device_name: names.get(&sensor.owner.rid).cloned().unwrap_or_default(),
                    id: sensor.id,
                    active,
                }
            })
            .collect())
    }

    pub async fn contact_sensors(&self) -> Result<Vec<ContactReading>> {
        let names = self.device_names().await?;
        let sensors: Vec<ContactResource> = Self::parse_all(self.get_resources("contact").await?);
        Ok(sensors
            .into_iter()
            .map(|sensor| ContactReading {
                device_name: names.get(&sensor.owner.rid).cloned().unwrap_or_default(),
                closed: sensor
                    .contact_report
                    .map(|report| report.state == "contact")
                    .unwrap_or(false),
                id: sensor.id,
            })
            .collect())
    }

    pub async fn temperature_sensors(&self) -> Result<Vec<TemperatureReading>> {
        let names = self.device_names().await?;
        let sensors: Vec<TemperatureResource> =
            Self::parse_all(self.get_resources("temperature").await?);
        Ok(sensors
            .into_iter()
            .map(|sensor| TemperatureReading {
                device_name: names.get(&sensor.owner.rid).cloned().unwrap_or_default(),
                celsius: sensor.temperature.temperature,
                id: sensor.id,
            })
            .collect())
    }

    pub async fn buttons(&self) -> Result<Vec<ButtonReading>> {
        let names = self.device_names().await?;
        let buttons: Vec<ButtonResource> = Self::parse_all(self.get_resources("button").await?);
        Ok(buttons
            .into_iter()
            .filter_map(|button| {
                let report = button.button.and_then(|state| state.button_report)?;
                Some(ButtonReading {
                    device_name: names.get(&button.owner.rid).cloned().unwrap_or_default(),
                    control_id: button.metadata.control_id,
                    last_event: report.event,
                    updated: report.updated,
                    id: button.id,
                })
            })
            .collect())
    }

    /// Recall (activate) a scene
    pub async fn activate_scene(&self, scene_id: &str) -> Result<()> {
        let url = format!("{}/scene/{}", self.base_url, scene_id);
        let body = json!({ "recall": { "action": "active" } });
        self.put(&url, body).await
    }

    /// Switch a grouped light on or off
    pub async fn set_lights(&self, grouped_light_id: &str, on: bool) -> Result<()> {
        let url = format!("{}/grouped_light/{}", self.base_url, grouped_light_id);
        let body = json!({ "on": { "on": on } });
        self.put(&url, body).await
    }

    async fn put(&self, url: &str, body: serde_json::Value) -> Result<()> {
        let reply: ApiReply = self
            .client
            .put(url)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(error) = reply.errors.first() {
            return Err(Error::bridge(error.description.clone()));
        }
        Ok(())
    }
}
