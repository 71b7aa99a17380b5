#[cfg(test)]
mod fixtures;

#[cfg(test)]
mod matchmaking_tests;
#[cfg(test)]
mod room_tests;
#[cfg(test)]
mod signaling_tests;
