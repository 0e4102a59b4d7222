mod decay;
mod emission;
mod movement;
mod nutrients;
mod phase_state;
mod reproduction;
