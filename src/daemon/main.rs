// Daemon main entry point
// Orchestrates the routine engine: periodic ticks fetch fresh bridge state,
// the engine decides, and the resulting commands go back to the bridge.

use chrono::{DateTime, Duration as ChronoDuration};
use chrono_tz::Tz;
use clap::Parser;
use hue_routines::{
    bridge::{BridgeClient, ContactReading, Scene, Zone},
    config::Config,
    engine::{Command, MotionPhase, RoutineEngine},
    sunset::SunsetCache,
    weather::{self, WeatherClient},
    Error, Result,
};
use log::{debug, info, warn, LevelFilter};
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::signal;
use tokio::time::{interval, sleep, Duration};

/// How long the temperature comparison scene stays up before the condition
/// scene supersedes it
const TEMPERATURE_FLASH_SECS: u64 = 10;

/// Minimum spacing between weather fetches triggered by a stale sunset cache
const SUNSET_FETCH_SPACING_MINS: i64 = 10;

#[derive(Parser, Debug)]
#[command(name = "hue-routines-daemon", about = "Hue lighting routines daemon")]
struct Args {
    /// Enable debug logging
    #[arg(long)]
    debug: bool,

    /// Path to config.toml (defaults to the XDG config directory)
    #[arg(long)]
    config: Option<PathBuf>,
}

/// Main daemon struct that owns the clients and the routine engine
struct Daemon {
    config: Config,
    timezone: Tz,
    bridge: BridgeClient,
    weather: Option<WeatherClient>,
    engine: RoutineEngine,
    sunset_cache: SunsetCache,
    last_sunset_fetch: Option<DateTime<Tz>>,
    /// previous motion state per sensor resource id, for edge detection
    prev_motion: HashMap<String, bool>,
    /// previous button report timestamp per button resource id
    prev_buttons: HashMap<String, String>,
}

impl Daemon {
    fn new(config: Config) -> Result<Self> {
        let timezone = config.parsed_timezone()?;
        let bridge = BridgeClient::new(&config.bridge_address, &config.bridge_app_key)?;

        let weather = if config.weather_zone.is_some() || !config.weather_api_key.is_empty() {
            Some(WeatherClient::new(
                config.city.clone(),
                config.weather_api_key.clone(),
                timezone,
            )?)
        } else {
            None
        };

        let engine = RoutineEngine::new(config.temperature_band_f, config.holiday_interval_hours);

        Ok(Self {
            timezone,
            bridge,
            weather,
            engine,
            sunset_cache: SunsetCache::new(),
            last_sunset_fetch: None,
            prev_motion: HashMap::new(),
            prev_buttons: HashMap::new(),
            config,
        })
    }

    /// Run the main daemon event loop
    async fn run(&mut self) -> Result<()> {
        info!("daemon started, bridge at {}", self.config.bridge_address);

        let mut weather_interval = interval(Duration::from_secs(self.config.weather_update_secs));
        let mut schedule_interval =
            interval(Duration::from_secs(self.config.schedule_update_secs));
        let mut event_interval = interval(Duration::from_secs(self.config.event_poll_secs));

        loop {
            tokio::select! {
                _ = signal::ctrl_c() => {
                    info!("received SIGINT, shutting down");
                    break;
                }
                _ = Self::wait_for_sigterm() => {
                    info!("received SIGTERM, shutting down");
                    break;
                }

                _ = weather_interval.tick() => {
                    if let Err(e) = self.weather_tick().await {
                        warn!("weather routine skipped this tick: {}", e);
                    }
                }

                _ = schedule_interval.tick() => {
                    if let Err(e) = self.schedule_tick().await {
                        warn!("schedule routine skipped this tick: {}", e);
                    }
                }

                _ = event_interval.tick() => {
                    if let Err(e) = self.event_tick().await {
                        warn!("event poll skipped this tick: {}", e);
                    }
                }
            }
        }

        info!("daemon shutdown complete");
        Ok(())
    }

    fn now(&self) -> DateTime<Tz> {
        chrono::Utc::now().with_timezone(&self.timezone)
    }

    /// Fetch zones and scenes fresh; scenes may be edited between ticks
    async fn fetch_state(&self) -> Result<(Vec<Zone>, Vec<Scene>)> {
        let zones = self.bridge.zones().await?;
        let scenes = self.bridge.scenes().await?;
        Ok((zones, scenes))
    }

    /// Weather routine tick: one fetch serves the weather zone and the sunset cache
    async fn weather_tick(&mut self) -> Result<()> {
        let Some(zone_name) = self.config.weather_zone.clone() else {
            return Ok(());
        };
        let (zones, scenes) = self.fetch_state().await?;
        let Some(zone) = find_zone(&zones, &zone_name) else {
            return Err(Error::NoMatch(format!("no zone named '{}'", zone_name)));
        };
        let zone_scenes = scenes_for(&scenes, zone);

        let report = match self.fetch_weather().await {
            Ok(report) => Some(report),
            Err(e) => {
                warn!("weather fetch failed: {}", e);
                None
            }
        };

        let inside_temp_f = match (&report, &self.config.temperature_sensor) {
            (Some(_), Some(sensor_name)) => self.inside_temperature(sensor_name).await,
            _ => None,
        };

        let commands =
            self.engine
                .weather_tick(zone, &zone_scenes, report.as_ref(), inside_temp_f);
        let flash = commands.len() == 2;
        for (idx, command) in commands.iter().enumerate() {
            self.execute(command).await;
            if flash && idx == 0 {
                // let the temperature scene show before the condition scene supersedes it
                sleep(Duration::from_secs(TEMPERATURE_FLASH_SECS)).await;
            }
        }
        Ok(())
    }

    /// Schedule and holiday routines tick
    async fn schedule_tick(&mut self) -> Result<()> {
        if self.config.scheduled_rooms.is_empty() && self.config.holiday_zone.is_none() {
            return Ok(());
        }

        let (zones, scenes) = self.fetch_state().await?;
        let now = self.now();
        let sunset = self.current_sunset().await;

        for room in self.config.scheduled_rooms.clone() {
            let Some(zone) = find_zone(&zones, &room) else {
                debug!("scheduled room '{}' not found on bridge", room);
                continue;
            };
            let zone_scenes = scenes_for(&scenes, zone);
            if let Some(command) =
                self.engine
                    .schedule_tick(zone, &zone_scenes, sunset, now.time())
            {
                self.execute(&command).await;
            }
        }

        if let Some(zone_name) = self.config.holiday_zone.clone() {
            if let Some(zone) = find_zone(&zones, &zone_name) {
                let zone_scenes = scenes_for(&scenes, zone);
                if let Some(command) =
                    self.engine
                        .holiday_tick(zone, &zone_scenes, now.naive_local())
                {
                    self.execute(&command).await;
                }
            } else {
                debug!("holiday zone '{}' not found on bridge", zone_name);
            }
        }

        Ok(())
    }

    /// Event poll tick: button presses, motion edges, motion countdowns
    async fn event_tick(&mut self) -> Result<()> {
        if self.config.buttons.is_empty() && self.config.motion.is_empty() {
            return Ok(());
        }

        let (zones, scenes) = self.fetch_state().await?;
        let now = self.now();
        let sunset = self.sunset_cache.get(now.date_naive());

        if !self.config.buttons.is_empty() {
            self.poll_buttons(&zones, &scenes, sunset, now).await?;
        }
        if !self.config.motion.is_empty() {
            self.poll_motion(&zones, &scenes, sunset, now).await?;
        }
        Ok(())
    }

    async fn poll_buttons(
        &mut self,
        zones: &[Zone],
        scenes: &[Scene],
        sunset: Option<chrono::NaiveTime>,
        now: DateTime<Tz>,
    ) -> Result<()> {
        let readings = self.bridge.buttons().await?;
        for binding in self.config.buttons.clone() {
            let Some(reading) = readings.iter().find(|r| {
                r.device_name.eq_ignore_ascii_case(&binding.device)
                    && r.control_id == binding.index
            }) else {
                continue;
            };

            let previous = self.prev_buttons.insert(reading.id.clone(), reading.updated.clone());
            let changed = previous.as_deref().is_some_and(|p| p != reading.updated);
            // a fresh report timestamp with a press event is a press edge; the
            // first observation after startup only primes the state
            if !changed || reading.last_event != "initial_press" {
                continue;
            }

            let Some(zone) = find_zone(zones, &binding.room) else {
                debug!("button room '{}' not found on bridge", binding.room);
                continue;
            };
            info!("button {} on '{}' pressed", binding.index, binding.device);
            let zone_scenes = scenes_for(scenes, zone);
            let command = self
                .engine
                .button_pressed(zone, &zone_scenes, sunset, now.time());
            self.execute(&command).await;
        }
        Ok(())
    }

    async fn poll_motion(
        &mut self,
        zones: &[Zone],
        scenes: &[Scene],
        sunset: Option<chrono::NaiveTime>,
        now: DateTime<Tz>,
    ) -> Result<()> {
        let readings = self.bridge.motion_sensors().await?;
        let contacts = self.fetch_contacts_if_needed().await;

        for binding in self.config.motion.clone() {
            let Some(zone) = find_zone(zones, &binding.room) else {
                debug!("motion room '{}' not found on bridge", binding.room);
                continue;
            };
            let zone_scenes = scenes_for(scenes, zone);
            let off_delay = ChronoDuration::seconds(binding.off_delay_secs as i64);

            if let Some(reading) = readings
                .iter()
                .find(|r| r.device_name.eq_ignore_ascii_case(&binding.sensor))
            {
                let previous = self.prev_motion.insert(reading.id.clone(), reading.active);
                let edge = previous != Some(reading.active);
                // the first observation only primes state unless motion is active
                let fire = match previous {
                    Some(_) => edge,
                    None => reading.active,
                };
                if fire {
                    debug!(
                        "motion {} in '{}'",
                        if reading.active { "detected" } else { "cleared" },
                        binding.room
                    );
                    if let Some(command) = self.engine.motion_event(
                        zone,
                        &zone_scenes,
                        sunset,
                        now.naive_local(),
                        reading.active,
                        off_delay,
                    ) {
                        self.execute(&command).await;
                    }
                }
            }

            if matches!(
                self.engine.motion_phase(&binding.room),
                MotionPhase::CountingDown { .. }
            ) {
                let door_closed = binding.door_sensor.as_ref().and_then(|door| {
                    contacts
                        .iter()
                        .find(|c| c.device_name.eq_ignore_ascii_case(door))
                        .map(|c| c.closed)
                });
                if let Some(command) =
                    self.engine
                        .motion_timeout_tick(zone, door_closed, now.naive_local())
                {
                    self.execute(&command).await;
                }
            }
        }
        Ok(())
    }

    /// Contact sensors are only fetched while some room with a door sensor is
    /// counting down
    async fn fetch_contacts_if_needed(&self) -> Vec<ContactReading> {
        let needed = self.config.motion.iter().any(|binding| {
            binding.door_sensor.is_some()
                && matches!(
                    self.engine.motion_phase(&binding.room),
                    MotionPhase::CountingDown { .. }
                )
        });
        if !needed {
            return Vec::new();
        }
        match self.bridge.contact_sensors().await {
            Ok(contacts) => contacts,
            Err(e) => {
                warn!("contact sensor fetch failed: {}", e);
                Vec::new()
            }
        }
    }

    /// Fetch the weather and record today's sunset as a side effect
    async fn fetch_weather(&mut self) -> Result<weather::WeatherReport> {
        let Some(client) = &self.weather else {
            return Err(Error::provider("weather", "no weather client configured"));
        };
        let now = self.now();
        self.last_sunset_fetch = Some(now);
        let report = client.fetch().await?;
        debug!(
            "weather: {} ({:.0}F), sunset {}",
            report.condition,
            report.feels_like_f,
            report.sunset.time()
        );
        self.sunset_cache
            .update(now.date_naive(), report.sunset_time());
        Ok(report)
    }

    /// Today's sunset, fetching it (rate-limited) when the cache is stale
    async fn current_sunset(&mut self) -> Option<chrono::NaiveTime> {
        let now = self.now();
        let today = now.date_naive();
        if let Some(sunset) = self.sunset_cache.get(today) {
            return Some(sunset);
        }
        if self.weather.is_none() {
            return None;
        }

        let recently_tried = self.last_sunset_fetch.is_some_and(|last| {
            now - last < ChronoDuration::minutes(SUNSET_FETCH_SPACING_MINS)
        });
        if recently_tried {
            return None;
        }

        match self.fetch_weather().await {
            Ok(_) => self.sunset_cache.get(today),
            Err(e) => {
                warn!("sunset unavailable: {}", e);
                None
            }
        }
    }

    /// Inside temperature in Fahrenheit from the named bridge sensor
    async fn inside_temperature(&self, sensor_name: &str) -> Option<f64> {
        let sensors = match self.bridge.temperature_sensors().await {
            Ok(sensors) => sensors,
            Err(e) => {
                warn!("temperature sensor fetch failed: {}", e);
                return None;
            }
        };
        let reading = sensors
            .iter()
            .find(|sensor| sensor.device_name.eq_ignore_ascii_case(sensor_name))?;
        let fahrenheit = weather::celsius_to_fahrenheit(reading.celsius);
        debug!("inside temperature: {:.1}F", fahrenheit);
        Some(fahrenheit)
    }

    /// Execute one command against the bridge; failures are logged, never fatal
    async fn execute(&self, command: &Command) {
        let result = match command {
            Command::ActivateScene {
                zone,
                scene_id,
                scene_name,
            } => {
                info!("activating '{}' in '{}'", scene_name, zone);
                self.bridge.activate_scene(scene_id).await
            }
            Command::SetLights {
                zone,
                grouped_light_id,
                on,
            } => {
                info!("turning '{}' {}", zone, if *on { "on" } else { "off" });
                self.bridge.set_lights(grouped_light_id, *on).await
            }
        };
        if let Err(e) = result {
            warn!("command failed: {}", e);
        }
    }

    /// Wait for SIGTERM signal
    async fn wait_for_sigterm() {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            let mut sigterm =
                signal(SignalKind::terminate()).expect("Failed to setup SIGTERM handler");
            sigterm.recv().await;
        }

        #[cfg(not(unix))]
        {
            std::future::pending::<()>().await;
        }
    }
}

fn find_zone<'a>(zones: &'a [Zone], name: &str) -> Option<&'a Zone> {
    zones.iter().find(|zone| zone.name.eq_ignore_ascii_case(name))
}

fn scenes_for(scenes: &[Scene], zone: &Zone) -> Vec<Scene> {
    scenes
        .iter()
        .filter(|scene| scene.zone_id == zone.id)
        .cloned()
        .collect()
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::builder()
        .filter_level(if args.debug {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        })
        .init();

    let config = match &args.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
    .map_err(|e| {
        if e.is_config_error() {
            eprintln!("Configuration error: {}", e);
            eprintln!("\nPlease fix the configuration file and try again.");
        }
        e
    })?;

    let mut daemon = Daemon::new(config)?;
    daemon.run().await
}
