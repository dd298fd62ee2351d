// Server defaults
pub const DEFAULT_SERVER_URL: &str = "http://localhost:8081";
pub const HEALTH_TIMEOUT_SECS: u64 = 2;
pub const REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_REQUEST_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_TOP_P: f32 = 0.9;
pub const DEFAULT_PROMPT: &str = "Explain the benefits of 1-bit quantization in neural networks";
pub const DEFAULT_MAX_TOKENS: u32 = 100;

// Sampling settings
pub const DATA_COLLECTION_INTERVAL_MS: u64 = 100;
pub const ENERGY_READING_WINDOW_MS: u64 = 100;
pub const CONTINUOUS_INTERVAL_SECS: u64 = 60;

// Energy model: watts drawn per GHz at 100% utilization
pub const WATTS_PER_GHZ: f64 = 10.0;
pub const DEFAULT_FREQUENCY_MHZ: f64 = 2000.0;

// Synthetic baseline scaling
pub const BASELINE_SPEED_FACTOR: f64 = 2.5;
pub const BASELINE_CPU_FACTOR: f64 = 1.8;
pub const BASELINE_CPU_CAP: f64 = 95.0;
pub const BASELINE_ENERGY_FACTOR: f64 = 3.5;

// Division guards
pub const MIN_ENERGY_WATTS: f64 = 0.1;
pub const MIN_DURATION_SECS: f64 = 1e-6;

// Sysfs / procfs locations
pub const PROC_STAT: &str = "/proc/stat";
pub const PROC_CPUINFO: &str = "/proc/cpuinfo";
pub const PROC_MEMINFO: &str = "/proc/meminfo";
pub const SYSFS_CPU_DIR: &str = "/sys/devices/system/cpu";
pub const SYSFS_HWMON_DIR: &str = "/sys/class/hwmon";
pub const SYSFS_THERMAL_DIR: &str = "/sys/class/thermal";

// Environment
pub const ENV_PREFIX: &str = "INFERENCE_POWER_";
pub const DEFAULT_CONFIG_SECTION: &str = "inference_power";
