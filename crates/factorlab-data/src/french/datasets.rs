//! Dataset locations and column layouts.

/// Momentum factor (UMD), monthly.
pub const URL_UMD: &str =
    "https://mba.tuck.dartmouth.edu/pages/faculty/ken.french/ftp/F-F_Momentum_Factor_CSV.zip";

/// Fama-French 5 factors (2x3), monthly.
pub const URL_FF5: &str = "https://mba.tuck.dartmouth.edu/pages/faculty/ken.french/ftp/F-F_Research_Data_5_Factors_2x3_CSV.zip";

/// 10 portfolios formed on prior (12-2) return.
pub const URL_DECILES: &str =
    "https://mba.tuck.dartmouth.edu/pages/faculty/ken.french/ftp/10_Portfolios_Prior_12_2_CSV.zip";

/// Column names for the momentum file. The published `Mom` column is exposed
/// as `UMD`.
pub const MOMENTUM_COLUMNS: [&str; 1] = ["UMD"];

/// Column names for the five-factor file.
pub const FF5_COLUMNS: [&str; 6] = ["Mkt-RF", "SMB", "HML", "RMW", "CMA", "RF"];
