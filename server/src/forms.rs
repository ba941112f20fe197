//! Menus opened through the game items.

use crate::game::Game;
use host::{EntityHandle, Menu, Tx};
use log::debug;

/// Host serving the player head images shown on teleporter buttons.
pub const AVATAR_BASE_URL: &str = "https://player.venitymc.com";

pub fn avatar_url(name: &str) -> String {
    format!("{}/{}/avatar.png", AVATAR_BASE_URL, name.to_lowercase())
}

/// Offers one button per available map. The answer counts as the player's
/// vote while the map has not been selected.
pub fn send_vote_map_menu(game: &Game, tx: &mut Tx<'_>, handle: &EntityHandle) {
    let mut menu = Menu::new("Vote Map").with_content("Select a map to vote:");
    for map in game.available_maps() {
        menu = menu.with_button(map.name());
    }

    let weak = game.weak();
    let menu = menu.with_callback(move |tx, player, index| {
        let Some(game) = weak.upgrade() else {
            return;
        };
        if game.is_closed() {
            return;
        }
        let Some(xuid) = tx.player(player).map(|p| p.xuid().to_string()) else {
            return;
        };
        if let Err(err) = game.vote_map(&xuid, index) {
            debug!("Vote of {} ignored: {}", xuid, err);
        }
    });

    if let Some(player) = tx.player_mut(handle) {
        player.send_form(menu);
    }
}

/// Offers one button per playing participant; choosing one teleports the
/// spectator to them.
pub fn send_teleporter_menu(game: &Game, tx: &mut Tx<'_>, handle: &EntityHandle) {
    let mut menu = Menu::new("Teleporter").with_content("Select a player to teleport to:");
    let mut targets = Vec::new();
    for par in game.playing_participants() {
        if let Some(player) = par.player(tx) {
            menu = menu.with_image_button(player.name(), avatar_url(player.name()));
            targets.push(par.xuid().to_string());
        }
    }

    let weak = game.weak();
    let menu = menu.with_callback(move |tx, player, index| {
        let Some(game) = weak.upgrade() else {
            return;
        };
        if game.is_closed() {
            return;
        }
        let in_game = tx
            .player(player)
            .map_or(false, |p| game.in_game(p.xuid()));
        if !in_game {
            return;
        }
        let Some(target) = targets.get(index).and_then(|xuid| game.participant(xuid)) else {
            return;
        };
        let Some(position) = target.player(tx).map(|p| p.position()) else {
            return;
        };
        if let Some(viewer) = tx.player_mut(player) {
            viewer.teleport(position);
        }
    });

    if let Some(player) = tx.player_mut(handle) {
        player.send_form(menu);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{run, Fixture};
    use assert_approx_eq::assert_approx_eq;
    use host::Vec3;
    use std::sync::Arc;
    use tokio_test::assert_ok;

    #[tokio::test]
    async fn test_vote_menu_records_vote() {
        let fixture = Fixture::new(3, 4);
        let game = fixture.game();
        let alice = fixture.connect("alice").await;
        assert_ok!(fixture.join(&game, &alice).await);

        let (g, a) = (Arc::clone(&game), alice.clone());
        let buttons = run(&fixture.lobby, move |tx| {
            send_vote_map_menu(&g, tx, &a);
            let menu = tx.player_mut(&a).unwrap().take_form().unwrap();
            assert_eq!(menu.title(), "Vote Map");
            assert_eq!(menu.content(), "Select a map to vote:");
            let buttons: Vec<_> = menu.buttons().iter().map(|b| b.text.clone()).collect();
            assert!(menu.buttons().iter().all(|b| b.image.is_none()));
            assert!(menu.submit(tx, &a, 1));
            buttons
        })
        .await;

        assert_eq!(buttons, vec!["island", "volcano"]);
        assert_eq!(game.participant("x-alice").unwrap().vote(), Some(1));
    }

    #[tokio::test]
    async fn test_vote_menu_rejects_forged_index() {
        let fixture = Fixture::new(3, 4);
        let game = fixture.game();
        let alice = fixture.connect("alice").await;
        assert_ok!(fixture.join(&game, &alice).await);

        let (g, a) = (Arc::clone(&game), alice.clone());
        let accepted = run(&fixture.lobby, move |tx| {
            send_vote_map_menu(&g, tx, &a);
            let menu = tx.player_mut(&a).unwrap().take_form().unwrap();
            menu.submit(tx, &a, 7)
        })
        .await;

        assert!(!accepted);
        assert_eq!(game.participant("x-alice").unwrap().vote(), None);
    }

    #[tokio::test]
    async fn test_teleporter_moves_spectator() {
        let fixture = Fixture::new(3, 4);
        let game = fixture.game();
        let alice = fixture.connect("alice").await;
        let bob = fixture.connect("bob").await;
        assert_ok!(fixture.join(&game, &alice).await);
        assert_ok!(fixture.join(&game, &bob).await);

        let (g, a, b) = (Arc::clone(&game), alice.clone(), bob.clone());
        let (buttons, position) = run(&fixture.lobby, move |tx| {
            tx.player_mut(&a).unwrap().teleport(Vec3::new(10.5, 70.0, -4.25));
            g.set_spectator(tx, &b).unwrap();

            send_teleporter_menu(&g, tx, &b);
            let menu = tx.player_mut(&b).unwrap().take_form().unwrap();
            assert_eq!(menu.title(), "Teleporter");
            let buttons = menu.buttons().to_vec();
            assert!(menu.submit(tx, &b, 0));
            (buttons, tx.player(&b).unwrap().position())
        })
        .await;

        assert_eq!(buttons.len(), 1);
        assert_eq!(buttons[0].text, "alice");
        assert_eq!(
            buttons[0].image.as_deref(),
            Some("https://player.venitymc.com/alice/avatar.png")
        );
        assert_approx_eq!(position.x, 10.5);
        assert_approx_eq!(position.y, 70.0);
        assert_approx_eq!(position.z, -4.25);
    }
}
