//! Weapon name, ammo and the clip the rig is playing

use bevy::prelude::*;

use crate::profiles::Armory;
use crate::rig::ClipPlayback;
use crate::viewmodel::{Slot, ViewModel, MAGAZINE_CAPACITY};

#[derive(Component)]
pub struct WeaponNameText;

#[derive(Component)]
pub struct AmmoText;

#[derive(Component)]
pub struct ClipText;

pub fn spawn_weapon_hud(mut commands: Commands) {
    commands
        .spawn(Node {
            position_type: PositionType::Absolute,
            right: Val::Px(20.0),
            bottom: Val::Px(20.0),
            flex_direction: FlexDirection::Column,
            align_items: AlignItems::End,
            row_gap: Val::Px(5.0),
            ..default()
        })
        .with_children(|parent| {
            parent.spawn((
                WeaponNameText,
                Text::new(""),
                TextFont {
                    font_size: 24.0,
                    ..default()
                },
                TextColor(Color::srgba(1.0, 1.0, 1.0, 0.9)),
            ));
            parent.spawn((
                AmmoText,
                Text::new(""),
                TextFont {
                    font_size: 32.0,
                    ..default()
                },
                TextColor(Color::srgba(1.0, 0.9, 0.6, 1.0)),
            ));
            parent.spawn((
                ClipText,
                Text::new(""),
                TextFont {
                    font_size: 14.0,
                    ..default()
                },
                TextColor(Color::srgba(0.7, 0.9, 1.0, 0.8)),
            ));
            parent.spawn((
                Text::new(concat!(
                    "[1] Rifle  [2] Fists  [H] Holster  [R] Reload  ",
                    "[F] Melee  [B] Mode  [E] Use  [V] Vault",
                )),
                TextFont {
                    font_size: 12.0,
                    ..default()
                },
                TextColor(Color::srgba(0.7, 0.7, 0.7, 0.6)),
            ));
        });
}

pub fn ammo_label(view_model: &ViewModel) -> String {
    match view_model.active() {
        Slot::Rifle => format!("{} / {}", view_model.rounds(), MAGAZINE_CAPACITY),
        Slot::Fists => "-".to_string(),
    }
}

pub fn clip_label(playback: &ClipPlayback, aiming: bool) -> String {
    let clip = playback.clip.as_deref().unwrap_or("Idle");
    let blend = match playback.blend {
        Some(seconds) => format!(" (blend {seconds:.2}s)"),
        None => String::new(),
    };
    let aim = if aiming { "  [ADS]" } else { "" };
    format!("{clip} {:.2}s{blend}{aim}", playback.elapsed)
}

pub fn update_weapon_hud(
    armory: Res<Armory>,
    view_model: Res<ViewModel>,
    playback: Res<ClipPlayback>,
    mut name: Query<&mut Text, (With<WeaponNameText>, Without<AmmoText>, Without<ClipText>)>,
    mut ammo: Query<&mut Text, (With<AmmoText>, Without<WeaponNameText>, Without<ClipText>)>,
    mut clip: Query<&mut Text, (With<ClipText>, Without<WeaponNameText>, Without<AmmoText>)>,
) {
    if let Ok(mut text) = name.single_mut() {
        let label = if view_model.is_holstered() {
            format!("{} (holstered)", view_model.name(&armory))
        } else {
            view_model.name(&armory).to_string()
        };
        **text = label;
    }
    if let Ok(mut text) = ammo.single_mut() {
        **text = ammo_label(&view_model);
    }
    if let Ok(mut text) = clip.single_mut() {
        **text = clip_label(&playback, view_model.is_aiming());
    }
}
