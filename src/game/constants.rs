/// Road geometry constants
pub mod road {
    /// Half-width of a road. A dog may stand this far past a road's
    /// endpoints or off its centre line, and a crossing road is detected
    /// within the same radius.
    pub const HALF_WIDTH: f64 = 0.4;
}

/// Movement constants
pub mod movement {
    /// Dog speed used when neither the map nor the config file sets one
    pub const DEFAULT_DOG_SPEED: f64 = 1.0;
}
