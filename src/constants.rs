//! Application constants for the permanents fetcher
//!
//! This module centralizes the host names, endpoints, file names and defaults
//! used throughout the application, organized by functional domain.

use std::time::Duration;

/// HTTP client configuration constants
pub mod http {
    use super::Duration;

    /// Default user agent for all HTTP requests
    pub const USER_AGENT: &str = concat!("perms-fetcher/", env!("CARGO_PKG_VERSION"));

    /// Default HTTP request timeout
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

    /// Connection establishment timeout
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Maximum idle connections per host in pool
    pub const POOL_MAX_PER_HOST: usize = 25;
}

/// RideWithGPS track hosting service
pub mod ridewithgps {
    /// Hosts served by RideWithGPS
    pub const HOSTS: &[&str] = &["ridewithgps.com", "www.ridewithgps.com"];

    /// Path prefix identifying a route page
    pub const ROUTES_PATH_PREFIX: &str = "/routes";

    /// Suffix appended to a route URL to obtain its GPX track export
    pub const TRACK_SUFFIX: &str = ".gpx?sub_format=track";
}

/// BikeRouteToaster track hosting service
pub mod bikeroutetoaster {
    /// Hosts served by BikeRouteToaster
    pub const HOSTS: &[&str] = &["bikeroutetoaster.com", "www.bikeroutetoaster.com"];

    /// Course metadata endpoint, the course id is appended
    pub const COURSE_URL: &str = "http://bikeroutetoaster.com/api/BRT.WebUI/Course/GetCourse/";

    /// GPX export endpoint accepting the course file as `{"data": ...}`
    pub const EXPORT_GPX_URL: &str = "http://bikeroutetoaster.com/BRTWebUI/Export/GPX";

    /// Field of the course metadata holding the exportable course
    pub const COURSE_FILE_FIELD: &str = "CourseFile";

    /// Pattern matching both known course URL shapes, capturing the id
    pub const COURSE_ID_PATTERN: &str = r"(?:Course\.aspx\?course=|BRTWebUI/Course/)(\d+)";
}

/// Audax Australia portal
pub mod portal {
    /// Hosts of the portal itself, linked from attachments but never a track
    pub const HOSTS: &[&str] = &["audax.org.au", "www.audax.org.au"];

    /// Ride list endpoint, the region code is appended
    pub const RIDE_LIST_URL: &str = "https://audax.org.au/portal/index.php/rides/online-permanents?chronoform=AudaxPermanents&event=getRideList&tvout=ajax&regionCode=";

    /// Single permanent endpoint, the permanent id is appended
    pub const PERMANENT_URL: &str = "https://audax.org.au/portal/index.php/component/chronoforms5?chronoform=AudaxPermanents&event=getPermanent&tvout=ajax&PermanentID=";

    /// Region codes harvested by default
    pub const REGIONS: &[u32] = &[
        211501, 311501, 411501, 511501, 611501, 711501, 811501, 911501,
    ];

    /// Placeholder id present in every ride list
    pub const SENTINEL_ID: u64 = 0;
}

/// Hosts that are linked from attachments but never carry a track
pub mod ignored {
    /// Search engine links
    pub const SEARCH_HOSTS: &[&str] = &["google.com", "www.google.com"];
}

/// File operation constants
pub mod files {
    /// Temporary file suffix for atomic operations
    pub const TEMP_FILE_SUFFIX: &str = ".tmp";

    /// Default route list produced by the harvester and read by the converter
    pub const DEFAULT_INPUT: &str = "perms.json";

    /// Default aggregate output
    pub const DEFAULT_OUTPUT: &str = "data/perms.json";

    /// Project-local configuration file name
    pub const CONFIG_FILE_NAME: &str = "perms-fetcher.toml";

    /// Application directory name under the user config directory
    pub const APP_DIR_NAME: &str = "perms-fetcher";
}

/// Cache layout constants
pub mod cache {
    /// Default cache directory, shared with the aggregate output
    pub const DEFAULT_CACHE_DIR: &str = "data";

    /// Extension of cached raw tracks
    pub const TRACK_EXTENSION: &str = "gpx";

    /// Extension of cached geometry collections
    pub const GEOMETRY_EXTENSION: &str = "geojson";

    /// Extension of cached topologies
    pub const TOPOLOGY_EXTENSION: &str = "topojson";

    /// Name of the single object inside every topology
    pub const TOPOLOGY_OBJECT_NAME: &str = "data";
}

/// Logging constants
pub mod logging {
    /// Default log level
    pub const DEFAULT_LOG_LEVEL: &str = "warn";
}

pub use files::{DEFAULT_INPUT, DEFAULT_OUTPUT, TEMP_FILE_SUFFIX};
pub use http::USER_AGENT;
