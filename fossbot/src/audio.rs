//! # Audio
//!
//! Playback of the sounds bundled with the FossBot. Sounds are played by an external player
//! process which is spawned and left to run on its own. Finished players are reaped on the next
//! call to [`AudioPlayer::play`].

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{debug, info, warn};
use std::{
    io,
    path::PathBuf,
    process::{Child, Command, Stdio},
};

use crate::params::AudioParams;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Sound files indexed by their id minus one.
const SOUND_FILES: [&str; 7] = [
    "geia.mp3",
    "mpravo.mp3",
    "empodio.mp3",
    "kalhmera.mp3",
    "euxaristw.mp3",
    "r2d2.mp3",
    "machine_gun.mp3",
];

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

pub struct AudioPlayer {
    player: String,
    sound_dir: PathBuf,

    /// Player processes which have not been seen to exit yet.
    children: Vec<Child>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl AudioPlayer {
    pub fn new(params: &AudioParams) -> Self {
        Self {
            player: params.player.clone(),
            sound_dir: PathBuf::from(&params.sound_dir),
            children: Vec::new(),
        }
    }

    /// Number of player processes still running.
    pub fn playing(&mut self) -> usize {
        self.reap();
        self.children.len()
    }

    /// Collect the exit status of finished players.
    fn reap(&mut self) {
        self.children.retain_mut(|child| match child.try_wait() {
            Ok(Some(_)) => false,
            Ok(None) => true,
            Err(e) => {
                warn!("Could not query sound player {}: {}", child.id(), e);
                false
            }
        });
    }

    /// Path of the sound with the given id, or `None` if there is no such sound.
    pub fn sound_path(&self, id: u32) -> Option<PathBuf> {
        sound_file(id).map(|f| self.sound_dir.join(f))
    }

    /// Start playing the sound, without waiting for it to finish.
    ///
    /// Unknown ids are ignored.
    pub fn play(&mut self, id: u32) -> Result<(), io::Error> {
        self.reap();

        let path = match self.sound_path(id) {
            Some(p) => p,
            None => {
                debug!("No sound with id {}", id);
                return Ok(());
            }
        };

        info!("Playing {}", path.display());

        let child = Command::new(&self.player)
            .arg(&path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;
        self.children.push(child);

        Ok(())
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Name of the file of the sound with the given id.
pub fn sound_file(id: u32) -> Option<&'static str> {
    match id {
        1..=7 => Some(SOUND_FILES[id as usize - 1]),
        _ => None,
    }
}
