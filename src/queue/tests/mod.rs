//! Test module organization for queue system
